//! Pass results and progress reporting.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::ExtractMode;

/// Final status of one entry in a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    /// The entry was written (or verified) successfully.
    Ok,
    /// A directory entry: created in extract mode, nothing to verify in test
    /// mode. Counts as a success.
    Skipped,
    /// The entry failed; the pass went on.
    Error(String),
    /// The entry needed a credential that was absent or rejected.
    WrongPassword,
}

impl EntryStatus {
    /// Returns `true` for [`Ok`](Self::Ok) and [`Skipped`](Self::Skipped).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::Skipped)
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Skipped => write!(f, "skipped"),
            Self::Error(reason) => write!(f, "error: {reason}"),
            Self::WrongPassword => write!(f, "wrong password"),
        }
    }
}

/// Outcome of one selected entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryOutcome {
    /// Engine index of the entry.
    pub index: u32,
    /// Entry path as reported by the archive (or the default item name).
    pub path: PathBuf,
    /// Unpacked size reported by the engine, 0 if unknown.
    pub size: u64,
    /// Final status.
    pub status: EntryStatus,
}

/// Aggregate result of one extract or test pass.
///
/// A pass with per-entry failures is still a successful pass; inspect
/// [`had_failures`](Self::had_failures).
#[derive(Debug, Clone)]
pub struct PassResult {
    /// Whether entries were written or only verified.
    pub mode: ExtractMode,
    /// Number of selected entries.
    pub attempted: usize,
    /// Entries that finished `Ok` or `Skipped`.
    pub succeeded: usize,
    /// Directory entries (a subset of `succeeded`).
    pub skipped: usize,
    /// Entries that failed with an error.
    pub errors: usize,
    /// Entries that failed for want of a valid password.
    pub wrong_password: usize,
    /// Sum of the selected entries' unpacked sizes, fixed at pass start.
    pub total_bytes: u64,
    /// Last cumulative byte count the engine reported.
    pub completed_bytes: u64,
    /// Bytes actually written to sinks.
    pub bytes_written: u64,
    /// Wall-clock duration of the pass.
    pub duration: Duration,
    /// Per-entry outcomes in ascending index order.
    pub entries: Vec<EntryOutcome>,
}

impl PassResult {
    pub(crate) fn new(mode: ExtractMode) -> Self {
        Self {
            mode,
            attempted: 0,
            succeeded: 0,
            skipped: 0,
            errors: 0,
            wrong_password: 0,
            total_bytes: 0,
            completed_bytes: 0,
            bytes_written: 0,
            duration: Duration::ZERO,
            entries: Vec::new(),
        }
    }

    /// Tallies an outcome and keeps it.
    pub(crate) fn record(&mut self, outcome: EntryOutcome) {
        self.attempted += 1;
        match &outcome.status {
            EntryStatus::Ok => self.succeeded += 1,
            EntryStatus::Skipped => {
                self.succeeded += 1;
                self.skipped += 1;
            }
            EntryStatus::Error(_) => self.errors += 1,
            EntryStatus::WrongPassword => self.wrong_password += 1,
        }
        self.entries.push(outcome);
    }

    /// Number of failed entries of either kind.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.errors + self.wrong_password
    }

    /// Returns `true` if any entry failed.
    #[must_use]
    pub const fn had_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Returns `true` if some entry failed only for want of a password.
    #[must_use]
    pub const fn needs_password(&self) -> bool {
        self.wrong_password > 0
    }

    /// Iterates over the failed entries.
    pub fn failures(&self) -> impl Iterator<Item = &EntryOutcome> {
        self.entries.iter().filter(|e| !e.status.is_success())
    }
}

/// Callback trait for progress reporting during a pass.
///
/// Callbacks run synchronously on the thread driving the pass, from inside
/// the engine's extract call.
///
/// # Examples
///
/// ```
/// use arkive_core::EntryStatus;
/// use arkive_core::ProgressCallback;
/// use std::path::Path;
///
/// struct Printer;
///
/// impl ProgressCallback for Printer {
///     fn on_pass_start(&mut self, entries: usize, total_bytes: u64) {
///         println!("{entries} entries, {total_bytes} bytes");
///     }
///
///     fn on_entry_start(&mut self, path: &Path, total: usize, current: usize) {
///         println!("[{current}/{total}] {}", path.display());
///     }
///
///     fn on_progress(&mut self, completed: u64, total: u64) {}
///
///     fn on_entry_complete(&mut self, path: &Path, status: &EntryStatus) {
///         println!("{}: {status}", path.display());
///     }
///
///     fn on_complete(&mut self) {}
/// }
/// ```
pub trait ProgressCallback: Send {
    /// Called once before the first entry, with the number of selected
    /// entries and the fixed byte total.
    fn on_pass_start(&mut self, entries: usize, total_bytes: u64);

    /// Called when the engine starts on an entry.
    ///
    /// # Arguments
    ///
    /// * `path` - Entry path
    /// * `total` - Number of selected entries
    /// * `current` - Position of this entry (1-indexed)
    fn on_entry_start(&mut self, path: &Path, total: usize, current: usize);

    /// Called when the cumulative completed byte count grows.
    fn on_progress(&mut self, completed: u64, total: u64);

    /// Called when an entry reaches its final status.
    fn on_entry_complete(&mut self, path: &Path, status: &EntryStatus);

    /// Called once after the last entry.
    fn on_complete(&mut self);
}

/// No-op implementation of `ProgressCallback`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_pass_start(&mut self, _entries: usize, _total_bytes: u64) {}

    fn on_entry_start(&mut self, _path: &Path, _total: usize, _current: usize) {}

    fn on_progress(&mut self, _completed: u64, _total: u64) {}

    fn on_entry_complete(&mut self, _path: &Path, _status: &EntryStatus) {}

    fn on_complete(&mut self) {}
}

/// Adapts a `(total, completed)` closure into a [`ProgressCallback`].
///
/// # Examples
///
/// ```
/// use arkive_core::ByteProgress;
/// use arkive_core::ProgressCallback;
///
/// let mut progress = ByteProgress::new(|total, completed| {
///     println!("{completed}/{total} bytes");
/// });
/// progress.on_pass_start(1, 4096);
/// progress.on_progress(1024, 4096);
/// ```
#[derive(Debug)]
pub struct ByteProgress<F> {
    callback: F,
}

impl<F: FnMut(u64, u64) + Send> ByteProgress<F> {
    /// Wraps `callback`, called as `callback(total, completed)`.
    pub const fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F: FnMut(u64, u64) + Send> ProgressCallback for ByteProgress<F> {
    fn on_pass_start(&mut self, _entries: usize, total_bytes: u64) {
        (self.callback)(total_bytes, 0);
    }

    fn on_entry_start(&mut self, _path: &Path, _total: usize, _current: usize) {}

    fn on_progress(&mut self, completed: u64, total: u64) {
        (self.callback)(total, completed);
    }

    fn on_entry_complete(&mut self, _path: &Path, _status: &EntryStatus) {}

    fn on_complete(&mut self) {}
}
