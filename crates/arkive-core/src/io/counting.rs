//! Byte-counting writer.

use std::io::Write;

/// Writer adapter that counts bytes accepted by the inner writer.
///
/// Only bytes the inner writer reports as written are counted, so a failed
/// or short write leaves the count exact.
///
/// # Examples
///
/// ```
/// use arkive_core::io::CountingWriter;
/// use std::io::Write;
///
/// let mut writer = CountingWriter::new(Vec::new());
/// writer.write_all(b"entry data")?;
/// assert_eq!(writer.total_bytes(), 10);
/// assert_eq!(writer.into_inner(), b"entry data");
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct CountingWriter<W> {
    inner: W,
    bytes_written: u64,
}

impl<W> CountingWriter<W> {
    /// Wraps `inner` with a zeroed counter.
    #[must_use]
    pub const fn new(inner: W) -> Self {
        Self {
            inner,
            bytes_written: 0,
        }
    }

    /// Bytes written so far.
    #[must_use]
    pub const fn total_bytes(&self) -> u64 {
        self.bytes_written
    }

    /// Unwraps the inner writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Borrows the inner writer.
    #[must_use]
    pub const fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.bytes_written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_write_all() {
        let mut writer = CountingWriter::new(Vec::new());
        writer.write_all(b"Hello").unwrap();
        writer.write_all(b", World!").unwrap();
        assert_eq!(writer.total_bytes(), 13);
        assert_eq!(writer.get_ref(), b"Hello, World!");
    }

    #[test]
    fn test_counts_formatted_output() {
        let mut writer = CountingWriter::new(Vec::new());
        write!(writer, "entry {}", 42).unwrap();
        assert_eq!(writer.total_bytes(), 8);
    }

    #[test]
    fn test_short_writes_counted_exactly() {
        struct Trickle(Vec<u8>);

        impl Write for Trickle {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                let n = buf.len().min(2);
                self.0.extend_from_slice(&buf[..n]);
                Ok(n)
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = CountingWriter::new(Trickle(Vec::new()));
        assert_eq!(writer.write(b"hello").unwrap(), 2);
        assert_eq!(writer.total_bytes(), 2);
        writer.write_all(b"abc").unwrap();
        assert_eq!(writer.total_bytes(), 5);
        assert_eq!(writer.into_inner().0, b"heabc");
    }

    #[test]
    fn test_failed_write_not_counted() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut writer = CountingWriter::new(Broken);
        assert!(writer.write_all(b"data").is_err());
        assert_eq!(writer.total_bytes(), 0);
    }
}
