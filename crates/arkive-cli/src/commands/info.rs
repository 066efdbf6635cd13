//! Info command implementation

use crate::cli::InfoArgs;
use crate::output::OutputFormatter;
use crate::output::Resolution;
use anyhow::Result;
use arkive_core::ExtractionConfig;
use arkive_core::FormatDescriptor;
use arkive_core::FormatRegistry;
use arkive_core::builtin_registry;
use arkive_core::registry::final_extension;
use std::path::Path;

pub fn execute(args: &InfoArgs, formatter: &dyn OutputFormatter) -> Result<bool> {
    let registry = builtin_registry();
    let config = ExtractionConfig::default();

    let resolutions: Vec<Resolution> = args
        .files
        .iter()
        .map(|path| resolve(registry, &config, path))
        .collect();

    formatter.format_resolutions(&resolutions)?;

    Ok(resolutions.iter().all(|r| r.format.is_some()))
}

/// Resolves by extension the same way opening does, without touching the
/// file.
fn resolve(registry: &FormatRegistry, config: &ExtractionConfig, path: &Path) -> Resolution {
    let extension = final_extension(path);
    let descriptor = if extension.is_empty() || config.is_extension_excluded(&extension) {
        None
    } else {
        registry.lookup_by_extension(&extension)
    };

    Resolution {
        path: path.to_path_buf(),
        format: descriptor.map(|d| d.name().to_string()),
        openable: descriptor.is_some_and(FormatDescriptor::can_open),
        extension,
    }
}
