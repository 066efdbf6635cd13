//! Per-entry output sinks.
//!
//! The engine receives an [`EntrySink`] as an owned `Box<dyn Write>`, but the
//! orchestrator must be able to flush and close the underlying file the moment
//! the entry completes, whether or not the engine has dropped its box yet.
//! Both sides therefore share one slot; [`SinkSlot::release`] empties it and
//! any later write through the engine's handle fails.

use std::cell::RefCell;
use std::fs::File;
use std::io::BufWriter;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use crate::io::CountingWriter;

type SinkWriter = CountingWriter<BufWriter<File>>;

/// Orchestrator-side owner of the current entry's output file.
#[derive(Debug, Default)]
pub(crate) struct SinkSlot {
    inner: Rc<RefCell<Option<SinkWriter>>>,
}

impl SinkSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Creates (or truncates) `path` and returns the engine-side handle.
    ///
    /// Any file still held by the slot is released first, and handles given
    /// out for it stay dead.
    pub(crate) fn open(&mut self, path: &Path) -> std::io::Result<EntrySink> {
        let _ = self.release();
        let file = File::create(path)?;
        let writer = CountingWriter::new(BufWriter::with_capacity(64 * 1024, file));
        self.inner = Rc::new(RefCell::new(Some(writer)));
        Ok(EntrySink {
            inner: Rc::clone(&self.inner),
        })
    }

    /// Returns `true` while a file is held.
    #[cfg(test)]
    pub(crate) fn is_active(&self) -> bool {
        self.inner.borrow().is_some()
    }

    /// Flushes and closes the held file, returning the bytes written.
    ///
    /// The file is closed even when the flush fails. Returns `Ok(None)` if
    /// nothing was held.
    pub(crate) fn release(&mut self) -> std::io::Result<Option<u64>> {
        let Some(mut writer) = self.inner.borrow_mut().take() else {
            return Ok(None);
        };
        let written = writer.total_bytes();
        writer.flush()?;
        Ok(Some(written))
    }
}

/// Engine-side handle on the current entry's output file.
pub(crate) struct EntrySink {
    inner: Rc<RefCell<Option<SinkWriter>>>,
}

impl Write for EntrySink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.inner.borrow_mut().as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(released()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.inner.borrow_mut().as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

fn released() -> std::io::Error {
    std::io::Error::new(ErrorKind::BrokenPipe, "entry sink already released")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_release_flushes_and_counts() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.bin");
        let mut slot = SinkSlot::new();

        let mut sink = slot.open(&path).unwrap();
        sink.write_all(b"hello").unwrap();
        assert!(slot.is_active());

        assert_eq!(slot.release().unwrap(), Some(5));
        assert!(!slot.is_active());
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[test]
    fn test_write_after_release_fails() {
        let temp = TempDir::new().unwrap();
        let mut slot = SinkSlot::new();
        let mut sink = slot.open(&temp.path().join("a")).unwrap();
        slot.release().unwrap();

        let err = sink.write(b"late").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
        assert!(sink.flush().is_ok());
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut slot = SinkSlot::new();
        assert_eq!(slot.release().unwrap(), None);
        assert_eq!(slot.release().unwrap(), None);
    }

    #[test]
    fn test_open_releases_previous() {
        let temp = TempDir::new().unwrap();
        let first = temp.path().join("first");
        let mut slot = SinkSlot::new();

        let mut sink = slot.open(&first).unwrap();
        sink.write_all(b"one").unwrap();
        let _second = slot.open(&temp.path().join("second")).unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert!(sink.write(b"x").is_err());
    }

    #[test]
    fn test_open_truncates() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("t");
        std::fs::write(&path, b"previous contents").unwrap();

        let mut slot = SinkSlot::new();
        let mut sink = slot.open(&path).unwrap();
        sink.write_all(b"new").unwrap();
        slot.release().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }
}
