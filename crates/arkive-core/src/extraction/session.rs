//! Archive sessions: resolve, open, run passes, close.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;

use crate::ArchiveError;
use crate::ExtractionConfig;
use crate::Result;
use crate::engine::ArchiveEngine;
use crate::engine::ArchiveHandler;
use crate::engine::EntryProp;
use crate::engine::ExtractMode;
use crate::engine::PropValue;
use crate::inspection::ArchiveListing;
use crate::registry::FormatDescriptor;
use crate::registry::FormatRegistry;
use crate::registry::final_extension;
use crate::report::PassResult;
use crate::report::ProgressCallback;

use super::pass::PassContext;
use super::pass::Selection;
use super::pass::run_pass;

/// Name used for pathless entries when nothing better is known.
const FALLBACK_ITEM_NAME: &str = "item";

/// A handler opened against an archive file, with the descriptor it was
/// resolved through.
pub struct OpenedArchive {
    descriptor: FormatDescriptor,
    extension: String,
    handler: Box<dyn ArchiveHandler>,
}

impl OpenedArchive {
    /// Wraps an already opened handler.
    pub fn new(
        descriptor: FormatDescriptor,
        extension: impl Into<String>,
        handler: Box<dyn ArchiveHandler>,
    ) -> Self {
        Self {
            descriptor,
            extension: extension.into(),
            handler,
        }
    }

    /// The descriptor the archive was opened through.
    #[must_use]
    pub const fn descriptor(&self) -> &FormatDescriptor {
        &self.descriptor
    }

    /// The lower-cased extension that matched.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

impl std::fmt::Debug for OpenedArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedArchive")
            .field("format", &self.descriptor.name())
            .field("extension", &self.extension)
            .finish_non_exhaustive()
    }
}

/// Resolves `path` to a format by its final extension and opens it.
///
/// # Errors
///
/// - [`ArchiveError::UnknownFormat`] if the path has no extension, the
///   extension is excluded by `config` (always for `exe`), or no format
///   registers it
/// - [`ArchiveError::MissingFormatId`] if the matched format cannot be
///   instantiated
/// - [`ArchiveError::Io`] if the file cannot be opened
/// - [`ArchiveError::OpenFailed`] if the engine rejects instantiation or the
///   structural open
///
/// `password` is handed to the engine for formats with encrypted headers.
pub fn resolve_and_open(
    registry: &FormatRegistry,
    engine: &dyn ArchiveEngine,
    path: &Path,
    config: &ExtractionConfig,
    password: Option<&str>,
) -> Result<OpenedArchive> {
    let extension = final_extension(path);
    let unknown = || ArchiveError::UnknownFormat {
        path: path.to_path_buf(),
    };

    if extension.is_empty() || config.is_extension_excluded(&extension) {
        return Err(unknown());
    }
    let descriptor = registry
        .lookup_by_extension(&extension)
        .ok_or_else(unknown)?;
    let format_id = descriptor
        .format_id()
        .ok_or_else(|| ArchiveError::MissingFormatId {
            format: descriptor.name().to_string(),
        })?;

    let open_failed = |status| ArchiveError::OpenFailed {
        format: descriptor.name().to_string(),
        status,
    };

    let file = File::open(path)?;
    let mut handler = engine.instantiate(format_id).map_err(open_failed)?;
    handler
        .open(Box::new(BufReader::new(file)), config.probe_bound, password)
        .map_err(open_failed)?;

    tracing::debug!(path = %path.display(), format = descriptor.name(), "archive opened");
    Ok(OpenedArchive::new(descriptor.clone(), extension, handler))
}

/// Lifecycle state of an [`ExtractionSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No archive attached.
    Closed,
    /// An archive is attached and idle.
    Opened,
    /// A pass is running.
    Extracting,
}

/// One opened archive plus the settings passes run with.
///
/// A session is driven from a single thread. Dropping it closes the archive.
///
/// # Examples
///
/// ```no_run
/// use arkive_core::BuiltinEngine;
/// use arkive_core::ExtractionConfig;
/// use arkive_core::ExtractionSession;
/// use arkive_core::NoopProgress;
/// use arkive_core::Selection;
/// use arkive_core::builtin_registry;
/// use std::path::Path;
///
/// # fn main() -> Result<(), arkive_core::ArchiveError> {
/// let mut session = ExtractionSession::open(
///     builtin_registry(),
///     &BuiltinEngine::new(),
///     Path::new("backup.zip"),
///     ExtractionConfig::default(),
/// )?;
/// session.set_password(Some("hunter2"));
/// let result = session.extract(Path::new("out"), &Selection::All, &mut NoopProgress)?;
/// println!("{} ok, {} failed", result.succeeded, result.failed());
/// session.close();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ExtractionSession {
    state: SessionState,
    archive: Option<OpenedArchive>,
    archive_path: Option<PathBuf>,
    output_root: Option<PathBuf>,
    password: Option<String>,
    config: ExtractionConfig,
    total_bytes: u64,
    completed_bytes: u64,
}

impl ExtractionSession {
    /// Creates a closed session.
    #[must_use]
    pub const fn new(config: ExtractionConfig) -> Self {
        Self {
            state: SessionState::Closed,
            archive: None,
            archive_path: None,
            output_root: None,
            password: None,
            config,
            total_bytes: 0,
            completed_bytes: 0,
        }
    }

    /// Resolves and opens `path`, returning an opened session.
    ///
    /// # Errors
    ///
    /// See [`resolve_and_open`].
    pub fn open(
        registry: &FormatRegistry,
        engine: &dyn ArchiveEngine,
        path: &Path,
        config: ExtractionConfig,
    ) -> Result<Self> {
        Self::open_with_password(registry, engine, path, config, None)
    }

    /// Like [`open`](Self::open), with a credential used both to read
    /// encrypted headers and, afterwards, as the session password.
    ///
    /// # Errors
    ///
    /// See [`resolve_and_open`].
    pub fn open_with_password(
        registry: &FormatRegistry,
        engine: &dyn ArchiveEngine,
        path: &Path,
        config: ExtractionConfig,
        password: Option<&str>,
    ) -> Result<Self> {
        let opened = resolve_and_open(registry, engine, path, &config, password)?;
        let mut session = Self::new(config);
        session.attach(opened, Some(path));
        session.set_password(password);
        Ok(session)
    }

    /// Attaches an opened archive, closing any previous one.
    ///
    /// `archive_path` is used to name pathless entries.
    pub fn attach(&mut self, archive: OpenedArchive, archive_path: Option<&Path>) {
        self.close();
        self.archive = Some(archive);
        self.archive_path = archive_path.map(Path::to_path_buf);
        self.state = SessionState::Opened;
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Descriptor of the attached archive.
    #[must_use]
    pub fn descriptor(&self) -> Option<&FormatDescriptor> {
        self.archive.as_ref().map(OpenedArchive::descriptor)
    }

    /// Sets the credential used for every encrypted entry of later passes.
    pub fn set_password(&mut self, password: Option<&str>) {
        self.password = password.map(str::to_string);
    }

    /// Sets the directory extract passes write into.
    pub fn set_output_root(&mut self, root: impl Into<PathBuf>) {
        self.output_root = Some(root.into());
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// `(total_bytes, completed_bytes)` of the most recent pass.
    #[must_use]
    pub const fn progress(&self) -> (u64, u64) {
        (self.total_bytes, self.completed_bytes)
    }

    /// Number of entries in the attached archive.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::SessionNotOpen`] or [`ArchiveError::Fatal`].
    pub fn entry_count(&self) -> Result<u32> {
        self.handler()?
            .entry_count()
            .map_err(|status| ArchiveError::Fatal { status })
    }

    /// Reads one entry property from the attached archive.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::SessionNotOpen`] or [`ArchiveError::InvalidArchive`]
    /// carrying the engine status.
    pub fn entry_property(&self, index: u32, prop: EntryProp) -> Result<PropValue> {
        self.handler()?
            .entry_property(index, prop)
            .map_err(|status| ArchiveError::InvalidArchive(format!("entry {index}: {status}")))
    }

    /// Lists every entry of the attached archive.
    ///
    /// # Errors
    ///
    /// [`ArchiveError::SessionNotOpen`] or [`ArchiveError::Fatal`].
    pub fn list(&self) -> Result<ArchiveListing> {
        let archive = self.archive.as_ref().ok_or(ArchiveError::SessionNotOpen)?;
        ArchiveListing::collect(archive.descriptor.name(), archive.handler.as_ref())
            .map_err(|status| ArchiveError::Fatal { status })
    }

    /// Runs one pass over the selected entries.
    ///
    /// Extract passes write below the output root set with
    /// [`set_output_root`](Self::set_output_root).
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::SessionNotOpen`] if no archive is attached
    /// - [`ArchiveError::NoOutputRoot`] for an extract pass without a root
    /// - [`ArchiveError::Fatal`] if the entry count cannot be read
    /// - [`ArchiveError::Io`] if the output root cannot be created
    pub fn run_pass(
        &mut self,
        selection: &Selection,
        mode: ExtractMode,
        progress: &mut dyn ProgressCallback,
    ) -> Result<PassResult> {
        if self.state == SessionState::Closed {
            return Err(ArchiveError::SessionNotOpen);
        }
        let default_name = self.default_item_name();
        let Some(archive) = self.archive.as_mut() else {
            return Err(ArchiveError::SessionNotOpen);
        };

        self.state = SessionState::Extracting;
        let ctx = PassContext {
            handler: archive.handler.as_mut(),
            output_root: self.output_root.as_deref(),
            password: self.password.as_deref(),
            default_name: &default_name,
            config: &self.config,
        };
        let outcome = run_pass(ctx, selection, mode, progress);
        self.state = SessionState::Opened;

        let result = outcome?;
        self.total_bytes = result.total_bytes;
        self.completed_bytes = result.completed_bytes;
        Ok(result)
    }

    /// Extracts the selected entries into `output_root`.
    ///
    /// # Errors
    ///
    /// See [`run_pass`](Self::run_pass).
    pub fn extract(
        &mut self,
        output_root: &Path,
        selection: &Selection,
        progress: &mut dyn ProgressCallback,
    ) -> Result<PassResult> {
        self.set_output_root(output_root);
        self.run_pass(selection, ExtractMode::Extract, progress)
    }

    /// Verifies the selected entries without writing anything.
    ///
    /// # Errors
    ///
    /// See [`run_pass`](Self::run_pass).
    pub fn test(
        &mut self,
        selection: &Selection,
        progress: &mut dyn ProgressCallback,
    ) -> Result<PassResult> {
        self.run_pass(selection, ExtractMode::TestOnly, progress)
    }

    /// Releases the archive. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut archive) = self.archive.take() {
            archive.handler.close();
            tracing::debug!(format = archive.descriptor.name(), "archive closed");
        }
        self.archive_path = None;
        self.state = SessionState::Closed;
    }

    fn handler(&self) -> Result<&dyn ArchiveHandler> {
        self.archive
            .as_ref()
            .map(|archive| archive.handler.as_ref())
            .ok_or(ArchiveError::SessionNotOpen)
    }

    /// Archive stem plus the add-extension of the matched extension:
    /// `backup.tgz` names its payload `backup.tar`.
    fn default_item_name(&self) -> String {
        let stem = self
            .archive_path
            .as_deref()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
            .filter(|stem| !stem.is_empty());
        let Some(stem) = stem else {
            return FALLBACK_ITEM_NAME.to_string();
        };

        let add = self
            .archive
            .as_ref()
            .and_then(|archive| archive.descriptor.add_extension_for(&archive.extension));
        match add {
            Some(add) if add.starts_with('.') => format!("{stem}{add}"),
            Some(add) => format!("{stem}.{add}"),
            None => stem,
        }
    }
}

impl Drop for ExtractionSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::NoopProgress;
    use crate::test_utils::MockArchive;
    use crate::test_utils::MockEngine;
    use crate::test_utils::MockEntry;
    use crate::test_utils::MockFormat;
    use tempfile::TempDir;

    fn session_for(archive: MockArchive, file_name: &str, add_ext: &str) -> (TempDir, ExtractionSession) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(file_name);
        std::fs::write(&path, b"mock").unwrap();
        let extension = final_extension(&path);
        let engine = MockEngine::new().with_format(
            MockFormat::new("Mock", &extension)
                .with_add_extensions(add_ext)
                .with_archive(archive),
        );
        let registry = FormatRegistry::build(&engine);
        let session =
            ExtractionSession::open(&registry, &engine, &path, ExtractionConfig::default()).unwrap();
        (temp, session)
    }

    #[test]
    fn test_lifecycle() {
        let (_temp, mut session) = session_for(
            MockArchive::new().with_entry(MockEntry::file("a.txt", b"abc")),
            "x.mock",
            "",
        );
        assert_eq!(session.state(), SessionState::Opened);
        assert_eq!(session.entry_count().unwrap(), 1);

        let result = session.test(&Selection::All, &mut NoopProgress).unwrap();
        assert_eq!(result.succeeded, 1);
        assert_eq!(session.state(), SessionState::Opened);

        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_pass_on_closed_session() {
        let mut session = ExtractionSession::new(ExtractionConfig::default());
        let err = session.test(&Selection::All, &mut NoopProgress).unwrap_err();
        assert!(matches!(err, ArchiveError::SessionNotOpen));
        assert!(matches!(session.entry_count(), Err(ArchiveError::SessionNotOpen)));
    }

    #[test]
    fn test_extract_without_root() {
        let (_temp, mut session) = session_for(
            MockArchive::new().with_entry(MockEntry::file("a", b"a")),
            "x.mock",
            "",
        );
        let err = session
            .run_pass(&Selection::All, ExtractMode::Extract, &mut NoopProgress)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::NoOutputRoot));
        assert_eq!(session.state(), SessionState::Opened);
    }

    #[test]
    fn test_entry_count_failure_is_fatal() {
        let (_temp, mut session) = session_for(
            MockArchive::new().with_failing_entry_count(),
            "x.mock",
            "",
        );
        let err = session.test(&Selection::All, &mut NoopProgress).unwrap_err();
        assert!(matches!(err, ArchiveError::Fatal { .. }));
        assert_eq!(session.state(), SessionState::Opened);
    }

    #[test]
    fn test_default_item_name_uses_add_extension() {
        let (temp, mut session) = session_for(
            MockArchive::new().with_entry(MockEntry::pathless(5)),
            "backup.tgz",
            ".tar",
        );
        let out = temp.path().join("out");
        let result = session.extract(&out, &Selection::All, &mut NoopProgress).unwrap();
        assert!(!result.had_failures());
        assert_eq!(result.entries[0].path, PathBuf::from("backup.tar"));
        assert_eq!(std::fs::read(out.join("backup.tar")).unwrap().len(), 5);
    }

    #[test]
    fn test_default_item_name_without_add_extension() {
        let (temp, mut session) = session_for(
            MockArchive::new().with_entry(MockEntry::pathless(1)),
            "data.gz",
            "",
        );
        let out = temp.path().join("out");
        session.extract(&out, &Selection::All, &mut NoopProgress).unwrap();
        assert!(out.join("data").is_file());
    }

    #[test]
    fn test_password_reused_across_passes() {
        let (_temp, mut session) = session_for(
            MockArchive::new()
                .with_entry(MockEntry::file("a", b"1").encrypted_with("pw"))
                .with_entry(MockEntry::file("b", b"2").encrypted_with("pw")),
            "x.mock",
            "",
        );
        let first = session.test(&Selection::All, &mut NoopProgress).unwrap();
        assert_eq!(first.wrong_password, 2);

        session.set_password(Some("pw"));
        let second = session.test(&Selection::All, &mut NoopProgress).unwrap();
        assert_eq!(second.succeeded, 2);
        assert!(!second.had_failures());
    }

    #[test]
    fn test_progress_recorded() {
        let (_temp, mut session) = session_for(
            MockArchive::new()
                .with_entry(MockEntry::file("a", &[1u8; 10]))
                .with_entry(MockEntry::file("b", &[2u8; 30])),
            "x.mock",
            "",
        );
        session.test(&Selection::All, &mut NoopProgress).unwrap();
        assert_eq!(session.progress(), (40, 40));
    }

    #[test]
    fn test_exe_never_opened() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("setup.EXE");
        std::fs::write(&path, b"MZ").unwrap();
        let engine = MockEngine::new().with_format(MockFormat::new("Pe", "exe"));
        let registry = FormatRegistry::build(&engine);
        assert!(registry.is_supported("exe"));

        let err = resolve_and_open(&registry, &engine, &path, &ExtractionConfig::default(), None)
            .unwrap_err();
        assert!(err.is_not_an_archive());
    }

    #[test]
    fn test_resolve_errors() {
        let temp = TempDir::new().unwrap();
        let engine = MockEngine::new()
            .with_format(MockFormat::new("Ghost", "gst").without_format_id())
            .with_format(MockFormat::new("Broken", "brk").with_failing_open());
        let registry = FormatRegistry::build(&engine);
        let config = ExtractionConfig::default();

        let noext = temp.path().join("README");
        std::fs::write(&noext, b"").unwrap();
        assert!(matches!(
            resolve_and_open(&registry, &engine, &noext, &config, None),
            Err(ArchiveError::UnknownFormat { .. })
        ));

        let ghost = temp.path().join("a.gst");
        std::fs::write(&ghost, b"").unwrap();
        assert!(matches!(
            resolve_and_open(&registry, &engine, &ghost, &config, None),
            Err(ArchiveError::MissingFormatId { .. })
        ));

        let broken = temp.path().join("a.BRK");
        std::fs::write(&broken, b"").unwrap();
        let err = resolve_and_open(&registry, &engine, &broken, &config, None).unwrap_err();
        assert!(matches!(err, ArchiveError::OpenFailed { ref format, .. } if format == "Broken"));

        let missing = temp.path().join("absent.brk");
        assert!(matches!(
            resolve_and_open(&registry, &engine, &missing, &config, None),
            Err(ArchiveError::Io(_))
        ));
    }
}
