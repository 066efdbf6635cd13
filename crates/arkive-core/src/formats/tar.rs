//! Tar handler.
//!
//! The header chain is walked once on open, recording where each member's
//! data starts. Extraction seeks straight to the requested members. Only
//! regular files and directories are exposed; links and special files are
//! skipped while indexing.

use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use crate::engine::ArchiveHandler;
use crate::engine::ArchiveStream;
use crate::engine::EngineResult;
use crate::engine::EntryProp;
use crate::engine::ExtractMode;
use crate::engine::ExtractProviders;
use crate::engine::OperationResult;
use crate::engine::PropValue;
use crate::error::EngineStatus;
use crate::timestamp;

use super::common::CachedEntry;
use super::common::Delivery;
use super::common::EntryTable;
use super::detect;

const BLOCK_SIZE: usize = 512;
const CHECKSUM_RANGE: std::ops::Range<usize> = 148..156;

/// Location of a member's data in the stream.
#[derive(Debug, Clone, Copy)]
struct DataSpan {
    offset: u64,
    size: u64,
}

/// Handler for uncompressed tar archives.
#[derive(Default)]
pub struct TarHandler {
    stream: Option<ArchiveStream>,
    entries: EntryTable,
    spans: Vec<DataSpan>,
}

impl TarHandler {
    /// Creates a closed handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Returns `true` if `block` looks like a tar header: either a `ustar`
/// magic, a valid v7 header checksum, or the all-zero end marker of an
/// empty archive.
fn looks_like_header(block: &[u8]) -> bool {
    if block.len() < BLOCK_SIZE {
        return false;
    }
    if block[257..262] == *detect::TAR_MAGIC {
        return true;
    }
    if block.iter().all(|&b| b == 0) {
        return true;
    }
    let stored = std::str::from_utf8(&block[CHECKSUM_RANGE])
        .ok()
        .map(|field| field.trim_matches(|c: char| c == '\0' || c == ' '))
        .and_then(|field| u32::from_str_radix(field, 8).ok());
    let computed: u32 = block
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if CHECKSUM_RANGE.contains(&i) {
                u32::from(b' ')
            } else {
                u32::from(b)
            }
        })
        .sum();
    stored == Some(computed)
}

fn index_members(
    archive: &mut tar::Archive<ArchiveStream>,
) -> std::io::Result<(Vec<CachedEntry>, Vec<DataSpan>)> {
    let mut entries = Vec::new();
    let mut spans = Vec::new();

    for member in archive.entries_with_seek()? {
        let member = member?;
        let header = member.header();
        let is_dir = match header.entry_type() {
            tar::EntryType::Regular | tar::EntryType::Continuous => false,
            tar::EntryType::Directory => true,
            other => {
                tracing::debug!(
                    path = %String::from_utf8_lossy(&member.path_bytes()),
                    entry_type = ?other,
                    "skipping non-regular tar member"
                );
                continue;
            }
        };

        let mtime = header
            .mtime()
            .ok()
            .and_then(|secs| i64::try_from(secs).ok())
            .map(timestamp::from_unix);
        let size = if is_dir { 0 } else { member.size() };

        entries.push(CachedEntry {
            path: Some(String::from_utf8_lossy(&member.path_bytes()).into_owned()),
            is_dir,
            size: Some(size),
            packed_size: Some(size),
            crc: None,
            encrypted: false,
            mtime,
            attributes: header.mode().ok(),
        });
        spans.push(DataSpan {
            offset: member.raw_file_position(),
            size,
        });
    }

    Ok((entries, spans))
}

/// Reads exactly `remaining` bytes, failing on a short stream.
struct Exact<R> {
    inner: R,
    remaining: u64,
}

impl<R: Read> Read for Exact<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let read = self.inner.read(&mut buf[..want])?;
        if read == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "tar member data is truncated",
            ));
        }
        self.remaining -= read as u64;
        Ok(read)
    }
}

impl ArchiveHandler for TarHandler {
    fn open(
        &mut self,
        mut stream: ArchiveStream,
        _probe_bound: u64,
        _password: Option<&str>,
    ) -> EngineResult<()> {
        self.close();

        let mut block = Vec::with_capacity(BLOCK_SIZE);
        (&mut stream)
            .take(BLOCK_SIZE as u64)
            .read_to_end(&mut block)?;
        stream.seek(SeekFrom::Start(0))?;
        if !looks_like_header(&block) {
            return Err(detect::not_recognised("tar"));
        }

        let mut archive = tar::Archive::new(stream);
        let (entries, spans) = index_members(&mut archive)
            .map_err(|e| EngineStatus::Archive(format!("failed to read tar headers: {e}")))?;

        tracing::debug!(entries = entries.len(), "opened tar archive");
        self.entries.set(entries);
        self.spans = spans;
        self.stream = Some(archive.into_inner());
        Ok(())
    }

    fn entry_count(&self) -> EngineResult<u32> {
        self.entries.count()
    }

    fn entry_property(&self, index: u32, prop: EntryProp) -> EngineResult<PropValue> {
        self.entries.property(index, prop)
    }

    fn extract(
        &mut self,
        indices: &[u32],
        mode: ExtractMode,
        providers: &mut ExtractProviders<'_>,
    ) -> EngineResult<()> {
        let stream = self.stream.as_mut().ok_or(EngineStatus::Fail)?;
        let entries = self.entries.entries()?;
        let mut delivery = Delivery::new();

        for &index in indices {
            let (entry, span) = entries
                .get(index as usize)
                .zip(self.spans.get(index as usize))
                .ok_or(EngineStatus::InvalidParam)?;

            let sink = (providers.sink)(index, mode);
            if entry.is_dir || (sink.is_none() && mode == ExtractMode::Extract) {
                (providers.outcome)(index, OperationResult::Ok);
                continue;
            }

            let result = match stream.seek(SeekFrom::Start(span.offset)) {
                Ok(_) => {
                    let mut data = Exact {
                        inner: &mut *stream,
                        remaining: span.size,
                    };
                    delivery.stream(&mut data, sink, providers.progress)
                }
                Err(e) => {
                    tracing::debug!(index, error = %e, "cannot seek to tar member");
                    OperationResult::DataError
                }
            };
            (providers.outcome)(index, result);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.stream = None;
        self.spans.clear();
        self.entries.clear();
    }
}
