//! Property-based tests for extension resolution and path sanitization.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use arkive_core::FormatDescriptor;
use arkive_core::FormatRegistry;
use arkive_core::registry::final_extension;
use arkive_core::registry::normalize_extension;
use arkive_core::security::sanitize_entry_path;
use proptest::prelude::*;
use std::path::Component;
use std::path::Path;

proptest! {
    /// Normalizing twice changes nothing.
    #[test]
    fn prop_normalize_idempotent(ext in "\\.?[a-zA-Z0-9]{0,10}") {
        let once = normalize_extension(&ext);
        prop_assert_eq!(normalize_extension(&once), once.clone());
        prop_assert!(!once.chars().any(|c| c.is_ascii_uppercase()));
    }

    /// Lookups ignore case and one leading dot.
    #[test]
    fn prop_lookup_case_insensitive(ext in "[a-z][a-z0-9]{0,6}") {
        let registry = FormatRegistry::from_descriptors([
            FormatDescriptor::new("Fmt").with_extensions(&ext),
        ]);
        let upper = ext.to_uppercase();
        let dotted = format!(".{upper}");
        prop_assert!(registry.is_supported(&upper));
        prop_assert_eq!(registry.lookup_by_extension(&dotted).map(FormatDescriptor::name), Some("Fmt"));
    }

    /// A file name without a dot never has an extension.
    #[test]
    fn prop_dotless_names_have_no_extension(
        dir in "([a-z]{1,5}\\.[a-z]{1,3}/){0,3}",
        name in "[A-Za-z0-9_-]{1,16}",
    ) {
        let path = format!("{dir}{name}");
        prop_assert_eq!(final_extension(Path::new(&path)), "");
    }

    /// Only the last token after the final dot counts.
    #[test]
    fn prop_final_extension_is_last_token(
        stem in "[a-z]{1,8}",
        inner in "[a-z]{1,4}",
        last in "[A-Za-z0-9]{1,4}",
    ) {
        let path = format!("{stem}.{inner}.{last}");
        prop_assert_eq!(final_extension(Path::new(&path)), last.to_lowercase());
    }

    /// Stripping mode always yields a path that stays below the root.
    #[test]
    fn prop_stripped_paths_stay_inside(
        parts in prop::collection::vec(prop_oneof![
            Just("..".to_string()),
            Just(".".to_string()),
            Just(String::new()),
            "[a-z]{1,6}",
        ], 0..8),
        rooted in any::<bool>(),
    ) {
        let joined = parts.join("/");
        let raw = if rooted { format!("/{joined}") } else { joined };
        let safe = sanitize_entry_path(&raw, false).unwrap();
        prop_assert!(safe.components().all(|c| matches!(c, Component::Normal(_))));
    }

    /// Rejecting mode refuses any path with a parent component.
    #[test]
    fn prop_parent_traversal_rejected(
        prefix in "([a-z]+/){0,4}",
        suffix in "([a-z]+/?){0,4}",
    ) {
        let raw = format!("{prefix}../{suffix}");
        prop_assert!(sanitize_entry_path(&raw, true).is_err());
    }
}
