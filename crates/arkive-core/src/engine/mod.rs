//! Archive engine contract.
//!
//! The engine is the component that actually understands container formats:
//! it advertises which formats exist, instantiates a handler for a format
//! identifier, enumerates entry properties and decodes entry data into a
//! caller-supplied sink. Nothing in this crate outside [`builtin`] and
//! [`crate::formats`] knows how any format is laid out.
//!
//! The engine calls back into the orchestrator through [`ExtractProviders`],
//! a bundle of plain function values, during [`ArchiveHandler::extract`].

pub mod builtin;

use std::io::Read;
use std::io::Seek;
use std::io::Write;

use crate::error::EngineStatus;
use crate::registry::FormatId;

pub use builtin::BuiltinEngine;

/// Result type for engine calls, carrying the engine's native status.
pub type EngineResult<T> = std::result::Result<T, EngineStatus>;

/// A byte stream that can be both read and repositioned.
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek> ReadSeek for T {}

/// Boxed archive input handed to a handler on open.
pub type ArchiveStream = Box<dyn ReadSeek + Send>;

/// A property value as reported by the engine.
///
/// Properties are loosely typed on purpose: callers decide what an
/// unexpected variant means for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    /// The property is not present for this item.
    Empty,
    /// Boolean value.
    Bool(bool),
    /// Unsigned 32-bit value.
    U32(u32),
    /// Unsigned 64-bit value.
    U64(u64),
    /// Text value.
    Str(String),
    /// Opaque bytes.
    Bytes(Vec<u8>),
    /// Windows FILETIME (100 ns ticks since 1601-01-01 UTC).
    FileTime(u64),
}

impl PropValue {
    /// Returns `true` for [`PropValue::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the text value, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as `u32` if it is a 32-bit integer.
    #[must_use]
    pub const fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `u64`, widening 32-bit integers.
    #[must_use]
    pub const fn as_u64(&self) -> Option<u64> {
        match self {
            Self::U64(v) => Some(*v),
            Self::U32(v) => Some(*v as u64),
            _ => None,
        }
    }

    /// Returns the boolean value.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the byte blob.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the FILETIME value.
    #[must_use]
    pub const fn as_filetime(&self) -> Option<u64> {
        match self {
            Self::FileTime(v) => Some(*v),
            _ => None,
        }
    }
}

/// Per-format properties an engine advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatProp {
    /// Unique format name (string).
    Name,
    /// Space-separated extension list (string).
    Extension,
    /// Space-separated alternate extension list (string).
    AddExtension,
    /// Capability flags (u32).
    Flags,
    /// Timestamp support flags (u32).
    TimeFlags,
    /// Handler class identifier (bytes).
    ClassId,
}

/// Per-entry properties a handler exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryProp {
    /// Intra-archive relative path (string).
    Path,
    /// Directory flag (bool).
    IsDir,
    /// Unpacked size (u64).
    Size,
    /// Packed size (u64).
    PackedSize,
    /// CRC32 of the unpacked data (u32).
    Crc,
    /// Encryption flag (bool).
    IsEncrypted,
    /// Modification time (FILETIME).
    MTime,
    /// Creation time (FILETIME).
    CTime,
    /// Access time (FILETIME).
    ATime,
    /// Platform attributes (u32).
    Attributes,
}

/// Whether a pass writes entries out or only verifies them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Decode entries into sinks supplied by the orchestrator.
    Extract,
    /// Decode entries and discard the data, checking integrity only.
    TestOnly,
}

impl std::fmt::Display for ExtractMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Extract => write!(f, "extract"),
            Self::TestOnly => write!(f, "test"),
        }
    }
}

/// Completion code an engine reports for one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    /// The entry decoded cleanly.
    Ok,
    /// The entry's data is corrupt or could not be decoded.
    DataError,
    /// The entry needs a credential that was absent or rejected.
    WrongPassword,
}

/// Callbacks the engine drives during [`ArchiveHandler::extract`].
///
/// For every index it processes, in ascending order, the engine calls
/// `sink` once, decodes the entry and then calls `outcome` once. In
/// [`ExtractMode::Extract`] a `None` sink means the orchestrator does not
/// want the data (directories, entries that already failed) and the engine
/// may skip decoding it. In [`ExtractMode::TestOnly`] the engine always
/// decodes and discards.
pub struct ExtractProviders<'a> {
    /// Returns the destination for an entry's data, or `None`.
    pub sink: &'a mut dyn FnMut(u32, ExtractMode) -> Option<Box<dyn Write>>,
    /// Receives each entry's completion code.
    pub outcome: &'a mut dyn FnMut(u32, OperationResult),
    /// Returns the credential to try for encrypted data.
    pub password: &'a dyn Fn() -> Option<String>,
    /// Receives the cumulative number of unpacked bytes processed.
    pub progress: &'a mut dyn FnMut(u64),
}

/// The engine: format enumeration and handler instantiation.
pub trait ArchiveEngine: Send + Sync {
    /// Number of formats the engine advertises.
    fn format_count(&self) -> EngineResult<u32>;

    /// Reads one property of the format at `index`.
    fn format_property(&self, index: u32, prop: FormatProp) -> EngineResult<PropValue>;

    /// Creates a handler for the format identified by `id`.
    fn instantiate(&self, id: &FormatId) -> EngineResult<Box<dyn ArchiveHandler>>;
}

/// One opened archive.
pub trait ArchiveHandler: Send {
    /// Parses the archive structure.
    ///
    /// The handler must not inspect more than `probe_bound` leading bytes
    /// while looking for its signature. `password` is only needed by
    /// formats that encrypt their metadata.
    fn open(
        &mut self,
        stream: ArchiveStream,
        probe_bound: u64,
        password: Option<&str>,
    ) -> EngineResult<()>;

    /// Number of entries in the opened archive.
    fn entry_count(&self) -> EngineResult<u32>;

    /// Reads one property of the entry at `index`.
    fn entry_property(&self, index: u32, prop: EntryProp) -> EngineResult<PropValue>;

    /// Decodes the entries in `indices` (ascending), driving `providers`.
    fn extract(
        &mut self,
        indices: &[u32],
        mode: ExtractMode,
        providers: &mut ExtractProviders<'_>,
    ) -> EngineResult<()>;

    /// Releases the archive stream and any cached state.
    fn close(&mut self);
}
