//! Formats command implementation

use crate::output::OutputFormatter;
use anyhow::Result;
use arkive_core::FormatDescriptor;
use arkive_core::builtin_registry;

pub fn execute(formatter: &dyn OutputFormatter) -> Result<bool> {
    let mut formats: Vec<&FormatDescriptor> = builtin_registry().descriptors().collect();
    formats.sort_by(|a, b| a.name().cmp(b.name()));

    formatter.format_formats(&formats)?;

    Ok(true)
}
