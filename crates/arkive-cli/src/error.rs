//! Error conversion utilities for CLI.
//!
//! Converts arkive-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use arkive_core::ArchiveError;
use arkive_core::EngineStatus;
use std::path::Path;

/// Converts `ArchiveError` to user-friendly anyhow error with context
pub fn convert_archive_error(err: ArchiveError, archive: &Path) -> anyhow::Error {
    match err {
        ArchiveError::UnknownFormat { path } => {
            anyhow!(
                "Not a supported archive: {}\n\
                 HINT: Run `arkive formats` to see the recognized extensions.",
                path.display()
            )
        }
        ArchiveError::MissingFormatId { format } => {
            anyhow!(
                "Format '{format}' of '{}' is recognized but cannot be opened",
                archive.display()
            )
        }
        ArchiveError::OpenFailed {
            format,
            status: EngineStatus::WrongPassword,
        } => {
            anyhow!(
                "Cannot open {format} archive '{}': its headers are encrypted\n\
                 HINT: Use --password to supply the archive password.",
                archive.display()
            )
        }
        ArchiveError::OpenFailed { format, status } => {
            anyhow!(
                "Cannot open '{}' as a {format} archive: {status}\n\
                 HINT: The file may be corrupted or have the wrong extension.",
                archive.display()
            )
        }
        ArchiveError::Fatal { status } => {
            anyhow!(
                "Cannot read the entries of '{}': {status}\n\
                 HINT: The archive may be corrupted or truncated.",
                archive.display()
            )
        }
        ArchiveError::Io(io_err) => {
            anyhow!(
                "I/O error while processing '{}': {}",
                archive.display(),
                io_err
            )
        }
        ArchiveError::InvalidArchive(reason) => {
            anyhow!(
                "Invalid archive '{}': {}\n\
                 HINT: The archive may be corrupted or malformed.",
                archive.display(),
                reason
            )
        }
        _ => anyhow::Error::from(err)
            .context(format!("Error processing archive '{}'", archive.display())),
    }
}

/// Adds context to a generic error about archive operations
pub fn add_archive_context<T>(
    result: Result<T, ArchiveError>,
    archive: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_archive_error(e, archive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_convert_unknown_format() {
        let err = ArchiveError::UnknownFormat {
            path: PathBuf::from("notes.txt"),
        };
        let msg = format!("{:?}", convert_archive_error(err, Path::new("notes.txt")));
        assert!(msg.contains("notes.txt"));
        assert!(msg.contains("arkive formats"));
    }

    #[test]
    fn test_convert_encrypted_headers() {
        let err = ArchiveError::OpenFailed {
            format: "7z".into(),
            status: EngineStatus::WrongPassword,
        };
        let msg = format!("{:?}", convert_archive_error(err, Path::new("locked.7z")));
        assert!(msg.contains("--password"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_open_failure() {
        let err = ArchiveError::OpenFailed {
            format: "zip".into(),
            status: EngineStatus::Archive("not a zip archive".into()),
        };
        let msg = format!("{:?}", convert_archive_error(err, Path::new("fake.zip")));
        assert!(msg.contains("not a zip archive"));
        assert!(msg.contains("fake.zip"));
    }

    #[test]
    fn test_convert_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let converted = convert_archive_error(ArchiveError::Io(io_err), Path::new("a.tar"));
        assert!(format!("{converted:?}").contains("I/O error"));
    }

    #[test]
    fn test_fallback_keeps_context() {
        let converted = convert_archive_error(ArchiveError::SessionNotOpen, Path::new("a.tar"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("a.tar"));
        assert!(msg.contains("no open archive"));
    }
}
