//! Builder for one-shot extract and test runs.

use std::path::PathBuf;

use crate::ArchiveError;
use crate::ExtractionConfig;
use crate::Result;
use crate::api::open_session;
use crate::extraction::ExtractionSession;
use crate::extraction::Selection;
use crate::report::NoopProgress;
use crate::report::PassResult;
use crate::report::ProgressCallback;

/// Builder for configuring a pass over one archive.
///
/// # Examples
///
/// ```no_run
/// use arkive_core::ArchiveBuilder;
/// use arkive_core::Selection;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let result = ArchiveBuilder::new()
///     .archive("archive.7z")
///     .output_dir("/tmp/output")
///     .password("hunter2")
///     .selection(Selection::indices([0, 2]))
///     .extract()?;
/// assert!(!result.had_failures());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    archive_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    password: Option<String>,
    selection: Selection,
    config: Option<ExtractionConfig>,
}

impl ArchiveBuilder {
    /// Creates a new `ArchiveBuilder`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the archive file path.
    #[must_use]
    pub fn archive(mut self, path: impl Into<PathBuf>) -> Self {
        self.archive_path = Some(path.into());
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Sets the password offered for encrypted entries.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Restricts the pass to some entries.
    #[must_use]
    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Sets the extraction configuration.
    #[must_use]
    pub fn config(mut self, config: ExtractionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Extracts the selected entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive path or output directory is not set,
    /// or if the archive cannot be opened or enumerated.
    pub fn extract(self) -> Result<PassResult> {
        self.extract_with_progress(&mut NoopProgress)
    }

    /// Extracts the selected entries, reporting to `progress`.
    ///
    /// # Errors
    ///
    /// See [`extract`](Self::extract).
    pub fn extract_with_progress(self, progress: &mut dyn ProgressCallback) -> Result<PassResult> {
        let output_dir = self.output_dir.clone().ok_or(ArchiveError::NoOutputRoot)?;
        let selection = self.selection.clone();
        let mut session = self.into_session()?;
        session.extract(&output_dir, &selection, progress)
    }

    /// Verifies the selected entries without writing anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive path is not set, or if the archive
    /// cannot be opened or enumerated.
    pub fn test(self) -> Result<PassResult> {
        self.test_with_progress(&mut NoopProgress)
    }

    /// Verifies the selected entries, reporting to `progress`.
    ///
    /// # Errors
    ///
    /// See [`test`](Self::test).
    pub fn test_with_progress(self, progress: &mut dyn ProgressCallback) -> Result<PassResult> {
        let selection = self.selection.clone();
        let mut session = self.into_session()?;
        session.test(&selection, progress)
    }

    fn into_session(self) -> Result<ExtractionSession> {
        let archive_path = self
            .archive_path
            .ok_or_else(|| ArchiveError::InvalidArchive("archive path not set".to_string()))?;
        open_session(
            &archive_path,
            self.config.unwrap_or_default(),
            self.password.as_deref(),
        )
    }
}
