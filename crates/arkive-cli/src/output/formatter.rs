//! Output formatter trait for CLI results.

use anyhow::Result;
use arkive_core::FormatDescriptor;
use arkive_core::PassResult;
use arkive_core::inspection::ArchiveListing;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

/// Outcome of resolving one path against the registry.
#[derive(Debug, Serialize)]
pub struct Resolution {
    pub path: PathBuf,
    pub extension: String,
    /// Matched format, `None` if the path is not a recognized archive.
    pub format: Option<String>,
    /// Whether the matched format can actually be opened.
    pub openable: bool,
}

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format an extract or test pass
    fn format_pass_result(&self, archive: &Path, result: &PassResult) -> Result<()>;

    /// Format archive listing
    fn format_listing(&self, listing: &ArchiveListing, long: bool, human_readable: bool)
    -> Result<()>;

    /// Format the registered formats, sorted by name
    fn format_formats(&self, formats: &[&FormatDescriptor]) -> Result<()>;

    /// Format path resolutions
    fn format_resolutions(&self, resolutions: &[Resolution]) -> Result<()>;
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    /// The operation ran but some items failed.
    Partial,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    pub fn partial(operation: impl Into<String>, data: T, error: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Partial,
            data: Some(data),
            error: Some(error.into()),
        }
    }
}
