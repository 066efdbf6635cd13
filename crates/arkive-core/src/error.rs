//! Error types for format resolution and extraction passes.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `ArchiveError`.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Native status reported by the archive engine.
///
/// Mirrors the small set of status codes an engine hands back from
/// instantiation, opening, enumeration and extraction. The orchestrator never
/// interprets these beyond carrying them to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    /// Generic failure.
    Fail,
    /// The request is not supported by this engine or format.
    Unsupported,
    /// An argument was rejected.
    InvalidParam,
    /// The engine ran out of memory.
    OutOfMemory,
    /// Compressed data is corrupt.
    DataError,
    /// A credential was required and was absent or rejected.
    WrongPassword,
    /// The container structure could not be parsed.
    Archive(String),
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fail => write!(f, "engine failure"),
            Self::Unsupported => write!(f, "unsupported operation"),
            Self::InvalidParam => write!(f, "invalid parameter"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::DataError => write!(f, "data error"),
            Self::WrongPassword => write!(f, "wrong password"),
            Self::Archive(reason) => write!(f, "{reason}"),
        }
    }
}

impl From<std::io::Error> for EngineStatus {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::OutOfMemory => Self::OutOfMemory,
            std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof => {
                Self::DataError
            }
            std::io::ErrorKind::InvalidInput => Self::InvalidParam,
            std::io::ErrorKind::Unsupported => Self::Unsupported,
            _ => Self::Archive(err.to_string()),
        }
    }
}

/// Errors surfaced by the registry-facing and session-facing API.
///
/// Per-entry failures are never represented here: they are tallied inside a
/// [`PassResult`](crate::PassResult) and the pass keeps going.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// I/O operation failed before the engine was involved.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The path's extension is not registered or is excluded by policy.
    #[error("not an archive: {}", path.display())]
    UnknownFormat {
        /// The path that could not be resolved.
        path: PathBuf,
    },

    /// The matched format has no identifier the engine can instantiate.
    #[error("format '{format}' cannot be opened (no handler identifier)")]
    MissingFormatId {
        /// Name of the display-only format.
        format: String,
    },

    /// The engine rejected instantiation or the structural open.
    #[error("failed to open {format} archive: {status}")]
    OpenFailed {
        /// Name of the format that was attempted.
        format: String,
        /// The engine's native status.
        status: EngineStatus,
    },

    /// The pass could not enumerate entries.
    #[error("cannot enumerate archive entries: {status}")]
    Fatal {
        /// The engine's native status.
        status: EngineStatus,
    },

    /// A pass was requested on a session with no attached handle.
    #[error("session has no open archive")]
    SessionNotOpen,

    /// An extract pass was requested without an output directory.
    #[error("no output directory set for extraction")]
    NoOutputRoot,

    /// Archive is corrupted or invalid.
    #[error("invalid archive: {0}")]
    InvalidArchive(String),
}

impl ArchiveError {
    /// Returns `true` if the file was simply not recognized as an archive.
    ///
    /// # Examples
    ///
    /// ```
    /// use arkive_core::ArchiveError;
    /// use std::path::PathBuf;
    ///
    /// let err = ArchiveError::UnknownFormat {
    ///     path: PathBuf::from("setup.exe"),
    /// };
    /// assert!(err.is_not_an_archive());
    ///
    /// let err = ArchiveError::SessionNotOpen;
    /// assert!(!err.is_not_an_archive());
    /// ```
    #[must_use]
    pub const fn is_not_an_archive(&self) -> bool {
        matches!(self, Self::UnknownFormat { .. })
    }

    /// Returns the engine status carried by this error, if any.
    #[must_use]
    pub const fn engine_status(&self) -> Option<&EngineStatus> {
        match self {
            Self::OpenFailed { status, .. } | Self::Fatal { status } => Some(status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_format_display() {
        let err = ArchiveError::UnknownFormat {
            path: PathBuf::from("notes.txt"),
        };
        assert_eq!(err.to_string(), "not an archive: notes.txt");
        assert!(err.is_not_an_archive());
    }

    #[test]
    fn test_open_failed_carries_status() {
        let err = ArchiveError::OpenFailed {
            format: "zip".into(),
            status: EngineStatus::Archive("bad central directory".into()),
        };
        assert!(err.to_string().contains("zip"));
        assert!(err.to_string().contains("bad central directory"));
        assert_eq!(
            err.engine_status(),
            Some(&EngineStatus::Archive("bad central directory".into()))
        );
    }

    #[test]
    fn test_fatal_carries_status() {
        let err = ArchiveError::Fatal {
            status: EngineStatus::Fail,
        };
        assert!(err.to_string().contains("enumerate"));
        assert_eq!(err.engine_status(), Some(&EngineStatus::Fail));
        assert!(!err.is_not_an_archive());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ArchiveError = io_err.into();
        assert!(matches!(err, ArchiveError::Io(_)));
        assert_eq!(err.engine_status(), None);
    }

    #[test]
    fn test_engine_status_from_io() {
        let status: EngineStatus =
            std::io::Error::new(std::io::ErrorKind::InvalidData, "crc").into();
        assert_eq!(status, EngineStatus::DataError);

        let status: EngineStatus =
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short").into();
        assert_eq!(status, EngineStatus::DataError);

        let status: EngineStatus = std::io::Error::other("boom").into();
        assert_eq!(status, EngineStatus::Archive("boom".into()));
    }

    #[test]
    fn test_engine_status_display() {
        assert_eq!(EngineStatus::WrongPassword.to_string(), "wrong password");
        assert_eq!(EngineStatus::DataError.to_string(), "data error");
    }
}
