//! Entry metadata and archive listings.

use std::path::PathBuf;
use std::time::SystemTime;

use crate::engine::ArchiveHandler;
use crate::engine::EntryProp;
use crate::engine::PropValue;
use crate::timestamp;

/// Metadata for one entry, read through the handler's property interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryInfo {
    /// Engine index.
    pub index: u32,
    /// Intra-archive path, absent for pathless single-stream payloads.
    pub path: Option<String>,
    /// Directory flag.
    pub is_dir: bool,
    /// Unpacked size, 0 when unknown.
    pub size: u64,
    /// Packed size, if reported.
    pub packed_size: Option<u64>,
    /// CRC32 of the unpacked data, if reported.
    pub crc: Option<u32>,
    /// Whether the entry's data is encrypted.
    pub encrypted: bool,
    /// Modification time as FILETIME, if reported.
    pub mtime: Option<u64>,
    /// Platform attributes, if reported.
    pub attributes: Option<u32>,
}

impl EntryInfo {
    /// Reads an entry's metadata.
    ///
    /// `path`, `is_dir`, `size` and `encrypted` are required in the sense that
    /// a failed read (or a value of the wrong type) fails the whole entry;
    /// an absent value means the default. The remaining properties are
    /// best-effort.
    pub fn query(handler: &dyn ArchiveHandler, index: u32) -> Result<Self, String> {
        let read = |prop: EntryProp| {
            handler
                .entry_property(index, prop)
                .map_err(|status| format!("cannot read {prop:?} of entry {index}: {status}"))
        };
        let mismatch = |prop: EntryProp, value: &PropValue| {
            format!("{prop:?} of entry {index} has unexpected value {value:?}")
        };

        let path = match read(EntryProp::Path)? {
            PropValue::Str(path) => Some(path),
            PropValue::Empty => None,
            other => return Err(mismatch(EntryProp::Path, &other)),
        };
        let is_dir = match read(EntryProp::IsDir)? {
            PropValue::Bool(flag) => flag,
            PropValue::Empty => false,
            other => return Err(mismatch(EntryProp::IsDir, &other)),
        };
        let size = match read(EntryProp::Size)? {
            PropValue::Empty => 0,
            other => other
                .as_u64()
                .ok_or_else(|| mismatch(EntryProp::Size, &other))?,
        };
        let encrypted = match read(EntryProp::IsEncrypted)? {
            PropValue::Bool(flag) => flag,
            PropValue::Empty => false,
            other => return Err(mismatch(EntryProp::IsEncrypted, &other)),
        };

        let optional = |prop: EntryProp| handler.entry_property(index, prop).ok();

        Ok(Self {
            index,
            path,
            is_dir,
            size,
            packed_size: optional(EntryProp::PackedSize).and_then(|v| v.as_u64()),
            crc: optional(EntryProp::Crc).and_then(|v| v.as_u32()),
            encrypted,
            mtime: optional(EntryProp::MTime).and_then(|v| v.as_filetime()),
            attributes: optional(EntryProp::Attributes).and_then(|v| v.as_u32()),
        })
    }

    /// Path for display, falling back to `default_name` when absent or
    /// empty.
    #[must_use]
    pub fn display_path(&self, default_name: &str) -> PathBuf {
        match self.path.as_deref() {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from(default_name),
        }
    }

    /// Modification time, if reported and representable.
    #[must_use]
    pub fn modified(&self) -> Option<SystemTime> {
        self.mtime.and_then(timestamp::to_system_time)
    }
}

/// Aggregate figures for an opened archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Name of the format the archive was opened as.
    pub format: String,
    /// Number of entries.
    pub entry_count: u32,
    /// Number of directory entries.
    pub directories: u32,
    /// Sum of unpacked sizes.
    pub total_size: u64,
    /// Sum of reported packed sizes.
    pub total_packed: u64,
    /// Whether any entry is encrypted.
    pub any_encrypted: bool,
}

/// Full listing of an opened archive.
#[derive(Debug, Clone, Default)]
pub struct ArchiveListing {
    /// Aggregate figures.
    pub summary: ArchiveSummary,
    /// Entries in index order. Entries whose metadata could not be read are
    /// omitted and counted in `unreadable`.
    pub entries: Vec<EntryInfo>,
    /// Number of entries whose metadata could not be read.
    pub unreadable: u32,
}

impl ArchiveListing {
    /// Builds a listing by querying every entry of `handler`.
    ///
    /// # Errors
    ///
    /// Returns the engine status if the entry count cannot be read.
    pub fn collect(
        format: &str,
        handler: &dyn ArchiveHandler,
    ) -> Result<Self, crate::error::EngineStatus> {
        let count = handler.entry_count()?;
        let mut listing = Self {
            summary: ArchiveSummary {
                format: format.to_string(),
                entry_count: count,
                ..ArchiveSummary::default()
            },
            ..Self::default()
        };

        for index in 0..count {
            match EntryInfo::query(handler, index) {
                Ok(info) => {
                    let summary = &mut listing.summary;
                    if info.is_dir {
                        summary.directories += 1;
                    }
                    summary.total_size = summary.total_size.saturating_add(info.size);
                    summary.total_packed = summary
                        .total_packed
                        .saturating_add(info.packed_size.unwrap_or(0));
                    summary.any_encrypted |= info.encrypted;
                    listing.entries.push(info);
                }
                Err(reason) => {
                    tracing::warn!(index, %reason, "skipping unreadable entry in listing");
                    listing.unreadable += 1;
                }
            }
        }

        Ok(listing)
    }
}
