//! Buffered copy with cumulative progress reporting.

use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;

/// Buffer size for entry copies (64 KiB).
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Reusable copy buffer, allocated once per extraction pass.
#[derive(Debug)]
pub struct CopyBuffer {
    buf: Box<[u8]>,
}

impl CopyBuffer {
    /// Allocates a 64 KiB buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; COPY_BUFFER_SIZE].into_boxed_slice(),
        }
    }
}

impl Default for CopyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies `reader` into `writer`, advancing `completed` and reporting it
/// after every chunk.
///
/// `completed` is a running total across entries, so the value handed to
/// `report` never decreases within a pass. Returns the bytes copied by this
/// call.
///
/// # Examples
///
/// ```
/// use arkive_core::io::CopyBuffer;
/// use arkive_core::io::copy_with_progress;
///
/// let mut buffer = CopyBuffer::new();
/// let mut completed = 100;
/// let mut seen = Vec::new();
/// let mut out = Vec::new();
///
/// let copied = copy_with_progress(
///     &mut &b"abcdef"[..],
///     &mut out,
///     &mut buffer,
///     &mut completed,
///     &mut |done| seen.push(done),
/// )?;
///
/// assert_eq!(copied, 6);
/// assert_eq!(completed, 106);
/// assert_eq!(seen, vec![106]);
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn copy_with_progress<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut CopyBuffer,
    completed: &mut u64,
    report: &mut dyn FnMut(u64),
) -> std::io::Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut copied = 0u64;
    loop {
        let n = match reader.read(&mut buffer.buf) {
            Ok(0) => return Ok(copied),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer.buf[..n])?;
        copied += n as u64;
        *completed = completed.saturating_add(n as u64);
        report(*completed);
    }
}
