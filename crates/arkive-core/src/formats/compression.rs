//! Single-stream compression codecs exposed as one-entry archives.
//!
//! A `.gz`, `.bz2`, `.xz` or `.zst` file holds exactly one payload. The
//! handler reports it as entry 0; its path comes from the gzip header when
//! one is stored and is otherwise absent, leaving the caller to derive a
//! name from the archive's own file name.
//!
//! # Supported Codecs
//!
//! - **Gzip** (.gz, .tgz): multi-member streams, stored name and mtime
//! - **Bzip2** (.bz2, .tbz2): concatenated streams
//! - **Xz** (.xz, .txz): multi-stream files
//! - **Zstd** (.zst, .tzst)

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

/// Compression codec of a single-stream file.
///
/// # Examples
///
/// ```
/// use arkive_core::formats::compression::Codec;
///
/// assert_eq!(Codec::Gzip.name(), "gzip");
/// assert_eq!(Codec::Zstd.signature(), &[0x28, 0xB5, 0x2F, 0xFD]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codec {
    /// Gzip (deflate).
    Gzip,
    /// Bzip2 (Burrows-Wheeler).
    Bzip2,
    /// Xz (LZMA2).
    Xz,
    /// Zstandard.
    Zstd,
}

impl Codec {
    /// Format name of the codec.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Bzip2 => "bzip2",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }

    /// Leading bytes every stream of this codec starts with.
    #[must_use]
    pub const fn signature(self) -> &'static [u8] {
        match self {
            Self::Gzip => detect::GZIP_MAGIC,
            Self::Bzip2 => detect::BZIP2_MAGIC,
            Self::Xz => detect::XZ_MAGIC,
            Self::Zstd => detect::ZSTD_MAGIC,
        }
    }

    /// Wraps `reader` in this codec's decoder.
    fn decoder<'a, R: Read + 'a>(self, reader: R) -> std::io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Self::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            Self::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
            Self::Xz => Box::new(xz2::read::XzDecoder::new_multi_decoder(reader)),
            Self::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }
}

/// Handler for one compressed stream.
pub struct StreamHandler {
    codec: Codec,
    stream: Option<ArchiveStream>,
    entries: EntryTable,
}

impl StreamHandler {
    /// Creates a closed handler for `codec`.
    #[must_use]
    pub fn new(codec: Codec) -> Self {
        Self {
            codec,
            stream: None,
            entries: EntryTable::default(),
        }
    }
}

/// Reads the stored name and mtime of the first gzip member, plus the
/// ISIZE trailer of the last one (the unpacked size modulo 2^32).
fn gzip_metadata(stream: &mut ArchiveStream) -> std::io::Result<CachedEntry> {
    let mut entry = CachedEntry::default();
    {
        let decoder = flate2::read::GzDecoder::new(&mut *stream);
        if let Some(header) = decoder.header() {
            entry.path = header
                .filename()
                .map(|name| String::from_utf8_lossy(name).into_owned())
                .filter(|name| !name.is_empty());
            entry.mtime = Some(header.mtime())
                .filter(|&secs| secs != 0)
                .map(|secs| timestamp::from_unix(i64::from(secs)));
        }
    }

    let len = stream.seek(SeekFrom::End(0))?;
    entry.packed_size = Some(len);
    if len >= 18 {
        stream.seek(SeekFrom::End(-4))?;
        let mut trailer = [0u8; 4];
        stream.read_exact(&mut trailer)?;
        entry.size = Some(u64::from(u32::from_le_bytes(trailer)));
    }
    stream.seek(SeekFrom::Start(0))?;
    Ok(entry)
}

impl ArchiveHandler for StreamHandler {
    fn open(
        &mut self,
        mut stream: ArchiveStream,
        _probe_bound: u64,
        _password: Option<&str>,
    ) -> EngineResult<()> {
        self.close();

        if !detect::starts_with_any(&mut stream, &[self.codec.signature()])? {
            return Err(detect::not_recognised(self.codec.name()));
        }

        let entry = match self.codec {
            Codec::Gzip => gzip_metadata(&mut stream)?,
            _ => {
                let len = stream.seek(SeekFrom::End(0))?;
                stream.seek(SeekFrom::Start(0))?;
                CachedEntry {
                    packed_size: Some(len),
                    ..CachedEntry::default()
                }
            }
        };

        tracing::debug!(codec = self.codec.name(), path = ?entry.path, "opened compressed stream");
        self.entries.set(vec![entry]);
        self.stream = Some(stream);
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
        if indices.iter().any(|&index| index != 0) {
            return Err(EngineStatus::InvalidParam);
        }
        if indices.is_empty() {
            return Ok(());
        }

        let sink = (providers.sink)(0, mode);
        if sink.is_none() && mode == ExtractMode::Extract {
            (providers.outcome)(0, OperationResult::Ok);
            return Ok(());
        }

        stream.seek(SeekFrom::Start(0))?;
        let result = match self.codec.decoder(&mut *stream) {
            Ok(mut decoder) => Delivery::new().stream(&mut decoder, sink, providers.progress),
            Err(e) => {
                tracing::debug!(codec = self.codec.name(), error = %e, "cannot start decoder");
                OperationResult::DataError
            }
        };
        (providers.outcome)(0, result);
        Ok(())
    }

    fn close(&mut self) {
        self.stream = None;
        self.entries.clear();
    }
}
