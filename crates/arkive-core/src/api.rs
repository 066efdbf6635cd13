//! High-level public API over the bundled engine and its process-wide
//! registry.

use std::path::Path;

use crate::ExtractionConfig;
use crate::Result;
use crate::engine::BuiltinEngine;
use crate::extraction::ExtractionSession;
use crate::extraction::Selection;
use crate::inspection::ArchiveListing;
use crate::registry::FormatDescriptor;
use crate::registry::builtin_registry;
use crate::report::NoopProgress;
use crate::report::PassResult;
use crate::report::ProgressCallback;

static ENGINE: BuiltinEngine = BuiltinEngine::new();

/// Returns `true` if some bundled format registers `extension`.
///
/// A leading dot is ignored and case does not matter.
///
/// # Examples
///
/// ```
/// use arkive_core::is_supported_extension;
///
/// assert!(is_supported_extension("ZIP"));
/// assert!(is_supported_extension(".tgz"));
/// assert!(!is_supported_extension("txt"));
/// ```
#[must_use]
pub fn is_supported_extension(extension: &str) -> bool {
    builtin_registry().is_supported(extension)
}

/// Looks up a bundled format by exact name, then by extension.
#[must_use]
pub fn lookup_format(name_or_extension: &str) -> Option<&'static FormatDescriptor> {
    builtin_registry().lookup(name_or_extension)
}

/// Names of all bundled formats, sorted.
#[must_use]
pub fn list_supported_format_names() -> Vec<String> {
    let mut names = builtin_registry().format_names();
    names.sort_unstable();
    names
}

/// Opens `archive_path` with the bundled engine.
///
/// `password` unlocks encrypted headers and becomes the session password.
///
/// # Errors
///
/// See [`resolve_and_open`](crate::resolve_and_open).
pub fn open_session<P: AsRef<Path>>(
    archive_path: P,
    config: ExtractionConfig,
    password: Option<&str>,
) -> Result<ExtractionSession> {
    ExtractionSession::open_with_password(
        builtin_registry(),
        &ENGINE,
        archive_path.as_ref(),
        config,
        password,
    )
}

/// Extracts every entry of an archive into `output_dir`.
///
/// Per-entry failures do not make this fail; inspect the returned
/// [`PassResult`].
///
/// # Errors
///
/// Returns an error if the archive cannot be resolved or opened, its entries
/// cannot be enumerated, or `output_dir` cannot be created.
///
/// # Examples
///
/// ```no_run
/// use arkive_core::extract_archive;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let result = extract_archive("archive.tar.gz", "/tmp/output", None)?;
/// println!("{} of {} entries extracted", result.succeeded, result.attempted);
/// # Ok(())
/// # }
/// ```
pub fn extract_archive<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    output_dir: Q,
    password: Option<&str>,
) -> Result<PassResult> {
    extract_archive_with_progress(
        archive_path,
        output_dir,
        password,
        ExtractionConfig::default(),
        &mut NoopProgress,
    )
}

/// Like [`extract_archive`], with an explicit config and progress callback.
///
/// # Errors
///
/// See [`extract_archive`].
pub fn extract_archive_with_progress<P: AsRef<Path>, Q: AsRef<Path>>(
    archive_path: P,
    output_dir: Q,
    password: Option<&str>,
    config: ExtractionConfig,
    progress: &mut dyn ProgressCallback,
) -> Result<PassResult> {
    let mut session = open_session(archive_path, config, password)?;
    session.extract(output_dir.as_ref(), &Selection::All, progress)
}

/// Verifies every entry of an archive without writing anything.
///
/// # Errors
///
/// Returns an error if the archive cannot be resolved or opened, or its
/// entries cannot be enumerated.
pub fn test_archive<P: AsRef<Path>>(
    archive_path: P,
    password: Option<&str>,
    progress: &mut dyn ProgressCallback,
) -> Result<PassResult> {
    let mut session = open_session(archive_path, ExtractionConfig::default(), password)?;
    session.test(&Selection::All, progress)
}

/// Lists the entries of an archive.
///
/// # Errors
///
/// Returns an error if the archive cannot be resolved or opened, or its
/// entries cannot be enumerated.
pub fn list_archive<P: AsRef<Path>>(
    archive_path: P,
    password: Option<&str>,
) -> Result<ArchiveListing> {
    open_session(archive_path, ExtractionConfig::default(), password)?.list()
}

/// Version of this crate as `(major, minor)`.
///
/// # Examples
///
/// ```
/// let (major, minor) = arkive_core::engine_version();
/// assert_eq!(format!("{major}.{minor}"), env!("CARGO_PKG_VERSION").rsplit_once('.').unwrap().0);
/// ```
#[must_use]
pub fn engine_version() -> (u32, u32) {
    let parse = |text: &str| text.parse().unwrap_or(0);
    (
        parse(env!("CARGO_PKG_VERSION_MAJOR")),
        parse(env!("CARGO_PKG_VERSION_MINOR")),
    )
}
