//! Signature probing within a bounded prefix of the archive stream.

use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use crate::error::EngineStatus;

/// 7z signature: `7z` followed by `BC AF 27 1C`.
pub const SEVENZ_MAGIC: &[u8] = &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];
/// Zip local file header.
pub const ZIP_LOCAL_MAGIC: &[u8] = b"PK\x03\x04";
/// Zip end-of-central-directory record, the only record of an empty zip.
pub const ZIP_EMPTY_MAGIC: &[u8] = b"PK\x05\x06";
/// Gzip member header.
pub const GZIP_MAGIC: &[u8] = &[0x1F, 0x8B];
/// Bzip2 stream header.
pub const BZIP2_MAGIC: &[u8] = b"BZh";
/// Xz stream header.
pub const XZ_MAGIC: &[u8] = &[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
/// Zstandard frame header.
pub const ZSTD_MAGIC: &[u8] = &[0x28, 0xB5, 0x2F, 0xFD];
/// Offset of the `ustar` magic inside a tar header block.
pub const TAR_MAGIC_OFFSET: u64 = 257;
/// Tar header magic (POSIX `ustar\0` and GNU `ustar `).
pub const TAR_MAGIC: &[u8] = b"ustar";

const SCAN_CHUNK: usize = 64 * 1024;

/// Checks whether the stream starts with one of `signatures`.
///
/// The stream is rewound to the start afterwards.
pub fn starts_with_any<R: Read + Seek + ?Sized>(
    stream: &mut R,
    signatures: &[&[u8]],
) -> std::io::Result<bool> {
    let longest = signatures.iter().map(|s| s.len()).max().unwrap_or(0);
    let head = read_prefix(stream, 0, longest)?;
    Ok(signatures.iter().any(|sig| head.starts_with(sig)))
}

/// Checks whether `signature` appears at `offset`.
pub fn matches_at<R: Read + Seek + ?Sized>(
    stream: &mut R,
    offset: u64,
    signature: &[u8],
) -> std::io::Result<bool> {
    let found = read_prefix(stream, offset, signature.len())?;
    Ok(found == signature)
}

/// Scans the first `bound` bytes for the earliest occurrence of any of
/// `signatures` and returns its offset.
///
/// Matches that start inside the bound but extend past it are not found.
/// The stream is rewound to the start afterwards.
pub fn find_signature<R: Read + Seek + ?Sized>(
    stream: &mut R,
    signatures: &[&[u8]],
    bound: u64,
) -> std::io::Result<Option<u64>> {
    let longest = signatures.iter().map(|s| s.len()).max().unwrap_or(0);
    if longest == 0 {
        return Ok(None);
    }

    stream.seek(SeekFrom::Start(0))?;
    let mut window: Vec<u8> = Vec::with_capacity(SCAN_CHUNK + longest);
    let mut window_start = 0u64;
    let mut chunk = vec![0u8; SCAN_CHUNK];
    let mut remaining = bound;
    let mut found = None;

    while remaining > 0 && found.is_none() {
        let want = usize::try_from(remaining).map_or(SCAN_CHUNK, |r| r.min(SCAN_CHUNK));
        let read = stream.read(&mut chunk[..want])?;
        if read == 0 {
            break;
        }
        remaining -= read as u64;
        window.extend_from_slice(&chunk[..read]);

        found = (0..window.len())
            .find(|&at| signatures.iter().any(|sig| window[at..].starts_with(sig)))
            .map(|at| window_start + at as u64);

        let keep = window.len().min(longest - 1);
        let drop = window.len() - keep;
        window.drain(..drop);
        window_start += drop as u64;
    }

    stream.seek(SeekFrom::Start(0))?;
    Ok(found)
}

/// Reads up to `len` bytes at `offset`, rewinding to the start afterwards.
fn read_prefix<R: Read + Seek + ?Sized>(
    stream: &mut R,
    offset: u64,
    len: usize,
) -> std::io::Result<Vec<u8>> {
    stream.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::with_capacity(len);
    (&mut *stream).take(len as u64).read_to_end(&mut buf)?;
    stream.seek(SeekFrom::Start(0))?;
    Ok(buf)
}

/// Status returned when a handler finds no signature it recognises.
pub(crate) fn not_recognised(format: &str) -> EngineStatus {
    EngineStatus::Archive(format!("not a {format} archive"))
}
