//! Format registry: extension and name resolution over an engine's formats.
//!
//! The registry is built once from whatever an [`ArchiveEngine`] advertises
//! and is read-only afterwards. All lookups are pure queries, so a built
//! registry can be shared freely across threads.
//!
//! # Examples
//!
//! ```
//! use arkive_core::BuiltinEngine;
//! use arkive_core::FormatRegistry;
//!
//! let registry = FormatRegistry::build(&BuiltinEngine::new());
//! assert_eq!(registry.lookup_by_extension(".TGZ").map(|d| d.name()), Some("gzip"));
//! assert!(!registry.is_supported("exe"));
//! ```

mod cache;
mod descriptor;

use std::collections::HashMap;
use std::path::Path;

use crate::engine::ArchiveEngine;
use crate::engine::FormatProp;
use crate::engine::PropValue;

pub use cache::RegistryCache;
pub use cache::builtin_registry;
pub use descriptor::FormatDescriptor;
pub use descriptor::FormatId;
pub use descriptor::flags;
pub use descriptor::normalize_extension;

/// In-memory index over all formats an engine advertises.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    by_name: HashMap<String, FormatDescriptor>,
    by_extension: HashMap<String, String>,
}

impl FormatRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry by enumerating `engine`'s formats.
    ///
    /// Never fails: a failed count query yields an empty registry, and a
    /// format whose name cannot be read is skipped with a warning.
    pub fn build(engine: &dyn ArchiveEngine) -> Self {
        let mut registry = Self::new();

        let count = match engine.format_count() {
            Ok(count) => count,
            Err(status) => {
                tracing::warn!(%status, "format enumeration failed, registry is empty");
                return registry;
            }
        };

        for index in 0..count {
            match read_descriptor(engine, index) {
                Some(descriptor) => registry.insert(descriptor),
                None => tracing::warn!(index, "skipping format without a readable name"),
            }
        }

        tracing::debug!(
            formats = registry.by_name.len(),
            extensions = registry.by_extension.len(),
            "format registry built"
        );
        registry
    }

    /// Builds a registry from ready-made descriptors, in order.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = FormatDescriptor>) -> Self {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.insert(descriptor);
        }
        registry
    }

    fn insert(&mut self, descriptor: FormatDescriptor) {
        let name = descriptor.name().to_string();
        tracing::debug!(format = %name, extensions = %descriptor.extension_list(), "registering format");

        for token in descriptor.extensions() {
            if let Some(previous) = self.by_extension.insert(token.clone(), name.clone())
                && previous != name
            {
                tracing::warn!(
                    extension = %token,
                    previous = %previous,
                    current = %name,
                    "extension registered twice, last registration wins"
                );
            }
        }

        if let Some(previous) = self.by_name.insert(name.clone(), descriptor) {
            tracing::warn!(
                format = %name,
                previous_extensions = %previous.extension_list(),
                "format name registered twice, last registration wins"
            );
        }
    }

    /// Exact, case-sensitive lookup by format name.
    #[must_use]
    pub fn lookup_by_name(&self, name: &str) -> Option<&FormatDescriptor> {
        self.by_name.get(name)
    }

    /// Looks up the format registered for `extension`.
    ///
    /// One leading dot is stripped and the token is case-folded, so `".ZIP"`
    /// and `"zip"` resolve identically. Tokens containing spaces never match.
    #[must_use]
    pub fn lookup_by_extension(&self, extension: &str) -> Option<&FormatDescriptor> {
        let token = normalize_extension(extension);
        self.by_extension
            .get(&token)
            .and_then(|name| self.by_name.get(name))
    }

    /// Returns `true` if some format registers `extension`.
    #[must_use]
    pub fn is_supported(&self, extension: &str) -> bool {
        self.by_extension
            .contains_key(&normalize_extension(extension))
    }

    /// Looks up by name first, then by extension.
    #[must_use]
    pub fn lookup(&self, name_or_extension: &str) -> Option<&FormatDescriptor> {
        self.lookup_by_name(name_or_extension)
            .or_else(|| self.lookup_by_extension(name_or_extension))
    }

    /// Snapshot of all format names. Order is unspecified.
    #[must_use]
    pub fn format_names(&self) -> Vec<String> {
        self.by_name.keys().cloned().collect()
    }

    /// Iterates over all descriptors. Order is unspecified.
    pub fn descriptors(&self) -> impl Iterator<Item = &FormatDescriptor> {
        self.by_name.values()
    }

    /// Number of registered formats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns `true` if no format is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Returns the lower-cased text after the last dot of the final path
/// segment, or an empty string if there is none.
///
/// Only the last token counts: `"a.tar.gz"` yields `"gz"`.
///
/// # Examples
///
/// ```
/// use arkive_core::registry::final_extension;
/// use std::path::Path;
///
/// assert_eq!(final_extension(Path::new("dir.v2/Backup.TAR.GZ")), "gz");
/// assert_eq!(final_extension(Path::new("dir.v2/README")), "");
/// ```
#[must_use]
pub fn final_extension(path: &Path) -> String {
    let Some(file_name) = path.file_name() else {
        return String::new();
    };
    let file_name = file_name.to_string_lossy();
    let segment = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    segment
        .rfind('.')
        .map(|dot| segment[dot + 1..].to_lowercase())
        .unwrap_or_default()
}

fn read_descriptor(engine: &dyn ArchiveEngine, index: u32) -> Option<FormatDescriptor> {
    let name = match engine.format_property(index, FormatProp::Name) {
        Ok(PropValue::Str(name)) if !name.is_empty() => name,
        _ => return None,
    };

    let text = |prop| match engine.format_property(index, prop) {
        Ok(PropValue::Str(value)) => value,
        _ => String::new(),
    };
    let number = |prop| match engine.format_property(index, prop) {
        Ok(PropValue::U32(value)) => value,
        _ => 0,
    };

    let mut descriptor = FormatDescriptor::new(name)
        .with_extensions(&text(FormatProp::Extension))
        .with_add_extensions(&text(FormatProp::AddExtension))
        .with_flags(number(FormatProp::Flags))
        .with_time_flags(number(FormatProp::TimeFlags));

    if let Ok(PropValue::Bytes(id)) = engine.format_property(index, FormatProp::ClassId)
        && !id.is_empty()
    {
        descriptor = descriptor.with_format_id(FormatId::new(id));
    }

    Some(descriptor)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::test_utils::MockEngine;
    use crate::test_utils::MockFormat;

    fn zip_and_tar() -> FormatRegistry {
        let engine = MockEngine::new()
            .with_format(MockFormat::new("Zip", "zip"))
            .with_format(MockFormat::new("Tar", "tar tgz"));
        FormatRegistry::build(&engine)
    }

    #[test]
    fn test_lookup_by_extension() {
        let registry = zip_and_tar();
        assert_eq!(registry.lookup_by_extension("tgz").unwrap().name(), "Tar");
        assert_eq!(registry.lookup_by_extension("zip").unwrap().name(), "Zip");
        assert!(registry.lookup_by_extension("gz").is_none());
    }

    #[test]
    fn test_lookup_case_insensitive() {
        let registry = zip_and_tar();
        assert_eq!(
            registry.lookup_by_extension("ZIP"),
            registry.lookup_by_extension("zip")
        );
        assert!(registry.is_supported(".TaR"));
    }

    #[test]
    fn test_lookup_edge_cases() {
        let registry = zip_and_tar();
        assert!(registry.lookup_by_extension("").is_none());
        assert!(registry.lookup_by_extension(".").is_none());
        assert!(registry.lookup_by_extension("tar tgz").is_none());
        assert!(!registry.is_supported("tar tgz"));
    }

    #[test]
    fn test_lookup_by_name_is_case_sensitive() {
        let registry = zip_and_tar();
        assert!(registry.lookup_by_name("Zip").is_some());
        assert!(registry.lookup_by_name("zip").is_none());
    }

    #[test]
    fn test_lookup_prefers_name() {
        let registry = zip_and_tar();
        assert_eq!(registry.lookup("Tar").unwrap().name(), "Tar");
        assert_eq!(registry.lookup("tgz").unwrap().name(), "Tar");
        assert!(registry.lookup("nope").is_none());
    }

    #[test]
    fn test_failed_count_yields_empty_registry() {
        let engine = MockEngine::new().with_failing_format_count();
        let registry = FormatRegistry::build(&engine);
        assert!(registry.is_empty());
        assert!(registry.format_names().is_empty());
    }

    #[test]
    fn test_unnamed_format_is_skipped() {
        let engine = MockEngine::new()
            .with_format(MockFormat::new("", "bad"))
            .with_format(MockFormat::new("Good", "good"));
        let registry = FormatRegistry::build(&engine);
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_supported("bad"));
        assert!(registry.is_supported("good"));
    }

    #[test]
    fn test_extension_collision_last_wins() {
        let engine = MockEngine::new()
            .with_format(MockFormat::new("First", "dup one"))
            .with_format(MockFormat::new("Second", "dup two"));
        let registry = FormatRegistry::build(&engine);
        assert_eq!(registry.lookup_by_extension("dup").unwrap().name(), "Second");
        assert_eq!(registry.lookup_by_extension("one").unwrap().name(), "First");
    }

    #[test]
    fn test_flags_and_id_forwarded() {
        let engine = MockEngine::new().with_format(
            MockFormat::new("Flagged", "flg")
                .with_flags(flags::MULTI_SIGNATURE | flags::KEEP_NAME)
                .with_time_flags(0x55),
        );
        let registry = FormatRegistry::build(&engine);
        let desc = registry.lookup_by_name("Flagged").unwrap();
        assert!(desc.is_multi_signature());
        assert_eq!(desc.time_flags(), 0x55);
        assert!(desc.can_open());
    }

    #[test]
    fn test_display_only_format_has_no_id() {
        let engine =
            MockEngine::new().with_format(MockFormat::new("Ghost", "gst").without_format_id());
        let registry = FormatRegistry::build(&engine);
        assert!(!registry.lookup_by_name("Ghost").unwrap().can_open());
    }

    #[test]
    fn test_final_extension() {
        assert_eq!(final_extension(Path::new("a/b/archive.ZIP")), "zip");
        assert_eq!(final_extension(Path::new("backup.tar.gz")), "gz");
        assert_eq!(final_extension(Path::new("noext")), "");
        assert_eq!(final_extension(Path::new("trailing.")), "");
        assert_eq!(final_extension(Path::new("dir.d/file")), "");
        assert_eq!(final_extension(Path::new("C:\\stuff\\setup.EXE")), "exe");
    }

    #[test]
    fn test_from_descriptors() {
        let registry = FormatRegistry::from_descriptors([
            FormatDescriptor::new("a").with_extensions("x"),
            FormatDescriptor::new("b").with_extensions("y x"),
        ]);
        assert_eq!(registry.lookup_by_extension("x").unwrap().name(), "b");
        let mut names = registry.format_names();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_name_last_wins() {
        let registry = FormatRegistry::from_descriptors([
            FormatDescriptor::new("same").with_extensions("old"),
            FormatDescriptor::new("same").with_extensions("new"),
        ]);
        assert_eq!(registry.format_names(), vec!["same"]);
        assert_eq!(
            registry.lookup_by_name("same").unwrap().extension_list(),
            "new"
        );
        assert_eq!(registry.lookup_by_extension("new").unwrap().name(), "same");
    }
}
