//! One extract or test pass over an opened handler.
//!
//! The pass hands the engine four provider closures that share a
//! [`PassState`] through a `RefCell`. The engine drives them strictly in
//! ascending index order: sink request, data, outcome. Every path that leaves
//! an entry (outcome, next sink request, end of the engine call) releases the
//! entry's sink before anything else happens.

use std::cell::RefCell;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;

use crate::ArchiveError;
use crate::ExtractionConfig;
use crate::Result;
use crate::engine::ArchiveHandler;
use crate::engine::ExtractMode;
use crate::engine::ExtractProviders;
use crate::engine::OperationResult;
use crate::inspection::EntryInfo;
use crate::report::EntryOutcome;
use crate::report::EntryStatus;
use crate::report::PassResult;
use crate::report::ProgressCallback;
use crate::security::sanitize_entry_path;
use crate::timestamp;

use super::stream::EntrySink;
use super::stream::SinkSlot;

/// Which entries a pass covers.
///
/// # Examples
///
/// ```
/// use arkive_core::Selection;
///
/// let some = Selection::indices([4, 1, 1]);
/// assert_eq!(some, Selection::Indices(vec![4, 1, 1]));
/// assert_eq!(Selection::default(), Selection::All);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Every entry in the archive.
    #[default]
    All,
    /// An explicit list of entry indices. Order and duplicates are
    /// irrelevant; entries are always processed once, in ascending order.
    Indices(Vec<u32>),
}

impl Selection {
    /// Builds an explicit selection.
    pub fn indices(indices: impl IntoIterator<Item = u32>) -> Self {
        Self::Indices(indices.into_iter().collect())
    }

    /// Splits the selection into sorted, de-duplicated in-range indices and
    /// the indices beyond `count`.
    pub(crate) fn resolve(&self, count: u32) -> (Vec<u32>, Vec<u32>) {
        match self {
            Self::All => ((0..count).collect(), Vec::new()),
            Self::Indices(list) => {
                let mut sorted = list.clone();
                sorted.sort_unstable();
                sorted.dedup();
                sorted.into_iter().partition(|&index| index < count)
            }
        }
    }
}

/// Inputs of one pass, borrowed from the session.
pub(crate) struct PassContext<'a> {
    pub handler: &'a mut dyn ArchiveHandler,
    pub output_root: Option<&'a Path>,
    pub password: Option<&'a str>,
    pub default_name: &'a str,
    pub config: &'a ExtractionConfig,
}

/// Orchestrator-side record of one selected entry.
struct Pending {
    index: u32,
    info: Option<EntryInfo>,
    display: PathBuf,
    status: Option<EntryStatus>,
    written: u64,
}

impl Pending {
    fn size(&self) -> u64 {
        self.info
            .as_ref()
            .filter(|info| !info.is_dir)
            .map_or(0, |info| info.size)
    }
}

struct PassState<'p> {
    mode: ExtractMode,
    output_root: Option<&'p Path>,
    default_name: &'p str,
    config: &'p ExtractionConfig,
    progress: &'p mut dyn ProgressCallback,
    entries: Vec<Pending>,
    sink: SinkSlot,
    current: Option<usize>,
    destination: Option<PathBuf>,
    started: usize,
    total: usize,
    total_bytes: u64,
    completed_bytes: u64,
}

impl PassState<'_> {
    fn position(&self, index: u32) -> Option<usize> {
        self.entries
            .binary_search_by_key(&index, |entry| entry.index)
            .ok()
    }

    /// Sink provider: the engine is about to decode `index`.
    fn begin(&mut self, index: u32) -> Option<Box<dyn Write>> {
        self.finish_current("engine moved on without reporting a result");

        let pos = self.position(index)?;
        if self.entries[pos].status.is_some() {
            return None;
        }

        self.started += 1;
        self.current = Some(pos);
        let entry_path = self.entries[pos].display.clone();
        self.progress
            .on_entry_start(&entry_path, self.total, self.started);
        tracing::debug!(index, path = %entry_path.display(), mode = %self.mode, "entry started");

        let is_dir = self.entries[pos]
            .info
            .as_ref()
            .is_some_and(|info| info.is_dir);
        if is_dir {
            let status = match self.mode {
                ExtractMode::Extract => self.create_directory(pos),
                ExtractMode::TestOnly => EntryStatus::Skipped,
            };
            self.settle(pos, status);
            return None;
        }

        if self.mode == ExtractMode::TestOnly {
            return None;
        }

        match self.open_sink(pos) {
            Ok(sink) => Some(Box::new(sink)),
            Err(reason) => {
                self.settle(pos, EntryStatus::Error(reason));
                None
            }
        }
    }

    /// Outcome sink: the engine finished `index`.
    fn complete(&mut self, index: u32, result: OperationResult) {
        let Some(pos) = self.position(index) else {
            return;
        };

        let released = if self.current == Some(pos) {
            self.release_sink(pos)
        } else {
            Ok(())
        };

        if self.entries[pos].status.is_some() {
            return;
        }

        let status = match (result, released) {
            (OperationResult::Ok, Ok(())) => EntryStatus::Ok,
            (OperationResult::Ok, Err(e)) => {
                EntryStatus::Error(format!("cannot finish writing output: {e}"))
            }
            (OperationResult::DataError, _) => EntryStatus::Error("data error".to_string()),
            (OperationResult::WrongPassword, _) => EntryStatus::WrongPassword,
        };

        if status == EntryStatus::Ok {
            self.apply_mtime(pos);
        }
        self.settle(pos, status);
    }

    /// Progress sink: cumulative completed bytes.
    fn advance(&mut self, completed: u64) {
        if completed > self.completed_bytes {
            self.completed_bytes = completed;
            self.progress.on_progress(completed, self.total_bytes);
        }
    }

    /// Releases the current entry's sink and settles it with `reason` if the
    /// engine never reported on it.
    fn finish_current(&mut self, reason: &str) {
        let Some(pos) = self.current else {
            return;
        };
        let _ = self.release_sink(pos);
        if self.entries[pos].status.is_none() {
            self.settle(pos, EntryStatus::Error(reason.to_string()));
        }
        self.current = None;
        self.destination = None;
    }

    fn release_sink(&mut self, pos: usize) -> std::io::Result<()> {
        match self.sink.release() {
            Ok(Some(written)) => {
                self.entries[pos].written = written;
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn settle(&mut self, pos: usize, status: EntryStatus) {
        let entry = &mut self.entries[pos];
        match &status {
            EntryStatus::Ok | EntryStatus::Skipped => {
                tracing::debug!(index = entry.index, path = %entry.display.display(), %status, "entry done");
            }
            EntryStatus::Error(_) | EntryStatus::WrongPassword => {
                tracing::warn!(index = entry.index, path = %entry.display.display(), %status, "entry failed");
            }
        }
        self.progress.on_entry_complete(&entry.display, &status);
        entry.status = Some(status);

        if self.current == Some(pos) {
            self.current = None;
            self.destination = None;
        }
    }

    fn relative_path(&self, pos: usize) -> std::result::Result<PathBuf, String> {
        let raw = self.entries[pos]
            .info
            .as_ref()
            .and_then(|info| info.path.as_deref())
            .unwrap_or("");
        let relative = sanitize_entry_path(raw, self.config.reject_unsafe_paths)
            .map_err(|e| e.to_string())?;
        if relative.as_os_str().is_empty() {
            return Ok(PathBuf::from(self.default_name));
        }
        Ok(relative)
    }

    fn create_directory(&self, pos: usize) -> EntryStatus {
        let Some(root) = self.output_root else {
            return EntryStatus::Error("no output directory".to_string());
        };
        let raw = self.entries[pos]
            .info
            .as_ref()
            .and_then(|info| info.path.as_deref())
            .unwrap_or("");
        let relative = match sanitize_entry_path(raw, self.config.reject_unsafe_paths) {
            Ok(relative) => relative,
            Err(e) => return EntryStatus::Error(e.to_string()),
        };
        let target = root.join(relative);
        match fs::create_dir_all(&target) {
            Ok(()) => EntryStatus::Skipped,
            Err(e) => EntryStatus::Error(format!(
                "cannot create directory {}: {e}",
                target.display()
            )),
        }
    }

    fn open_sink(&mut self, pos: usize) -> std::result::Result<EntrySink, String> {
        let root = self
            .output_root
            .ok_or_else(|| "no output directory".to_string())?;
        let target = root.join(self.relative_path(pos)?);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("cannot create directory {}: {e}", parent.display()))?;
        }
        let sink = self
            .sink
            .open(&target)
            .map_err(|e| format!("cannot create {}: {e}", target.display()))?;
        self.destination = Some(target);
        Ok(sink)
    }

    fn apply_mtime(&self, pos: usize) {
        if !self.config.preserve_mtime || self.mode != ExtractMode::Extract {
            return;
        }
        let (Some(target), Some(mtime)) = (
            self.destination.as_ref(),
            self.entries[pos].info.as_ref().and_then(|info| info.mtime),
        ) else {
            return;
        };
        let (seconds, nanos) = timestamp::to_unix(mtime);
        let time = filetime::FileTime::from_unix_time(seconds, nanos);
        if let Err(e) = filetime::set_file_mtime(target, time) {
            tracing::warn!(path = %target.display(), error = %e, "cannot set modification time");
        }
    }

    /// Gives every entry still unsettled a final error.
    fn fail_unsettled(&mut self, reason: &str) {
        for pos in 0..self.entries.len() {
            if self.entries[pos].status.is_none() {
                self.settle(pos, EntryStatus::Error(reason.to_string()));
            }
        }
    }
}

/// Runs one pass and collects the per-entry outcomes.
///
/// Only a failed entry count (or an unusable output root) aborts the pass;
/// everything that goes wrong for a single entry is recorded and the pass
/// continues.
pub(crate) fn run_pass(
    ctx: PassContext<'_>,
    selection: &Selection,
    mode: ExtractMode,
    progress: &mut dyn ProgressCallback,
) -> Result<PassResult> {
    let start = Instant::now();

    let output_root = match mode {
        ExtractMode::Extract => {
            let root = ctx.output_root.ok_or(ArchiveError::NoOutputRoot)?;
            fs::create_dir_all(root)?;
            Some(root)
        }
        ExtractMode::TestOnly => None,
    };

    let count = ctx
        .handler
        .entry_count()
        .map_err(|status| ArchiveError::Fatal { status })?;
    let (selected, out_of_range) = selection.resolve(count);

    let mut entries = Vec::with_capacity(selected.len());
    let mut metadata_failures = Vec::new();
    for index in selected {
        match EntryInfo::query(&*ctx.handler, index) {
            Ok(info) => entries.push(Pending {
                index,
                display: info.display_path(ctx.default_name),
                info: Some(info),
                status: None,
                written: 0,
            }),
            Err(reason) => {
                metadata_failures.push((entries.len(), reason));
                entries.push(Pending {
                    index,
                    info: None,
                    display: PathBuf::from(format!("#{index}")),
                    status: None,
                    written: 0,
                });
            }
        }
    }

    let total_bytes = entries
        .iter()
        .fold(0u64, |acc, entry| acc.saturating_add(entry.size()));
    let total = entries.len() + out_of_range.len();
    progress.on_pass_start(total, total_bytes);

    let mut state = PassState {
        mode,
        output_root,
        default_name: ctx.default_name,
        config: ctx.config,
        progress,
        entries,
        sink: SinkSlot::new(),
        current: None,
        destination: None,
        started: 0,
        total,
        total_bytes,
        completed_bytes: 0,
    };

    for (pos, reason) in metadata_failures {
        state.settle(pos, EntryStatus::Error(reason));
    }

    let engine_indices: Vec<u32> = state
        .entries
        .iter()
        .filter(|entry| entry.status.is_none())
        .map(|entry| entry.index)
        .collect();

    let engine_status = if engine_indices.is_empty() {
        Ok(())
    } else {
        let shared = RefCell::new(state);
        let password = ctx.password.map(str::to_string);
        let status = {
            let mut sink = |index: u32, _mode: ExtractMode| shared.borrow_mut().begin(index);
            let mut outcome =
                |index: u32, result: OperationResult| shared.borrow_mut().complete(index, result);
            let password_provider = || password.clone();
            let mut advance = |completed: u64| shared.borrow_mut().advance(completed);
            let mut providers = ExtractProviders {
                sink: &mut sink,
                outcome: &mut outcome,
                password: &password_provider,
                progress: &mut advance,
            };
            ctx.handler.extract(&engine_indices, mode, &mut providers)
        };
        state = shared.into_inner();
        status
    };

    state.finish_current("engine reported no result");
    match engine_status {
        Ok(()) => state.fail_unsettled("engine reported no result"),
        Err(status) => {
            tracing::warn!(%status, "engine aborted the pass");
            state.fail_unsettled(&format!("engine aborted: {status}"));
        }
    }

    let mut result = PassResult::new(mode);
    result.total_bytes = total_bytes;
    result.completed_bytes = state.completed_bytes;
    for entry in state.entries {
        result.bytes_written += entry.written;
        let size = entry.size();
        result.record(EntryOutcome {
            index: entry.index,
            path: entry.display,
            size,
            status: entry
                .status
                .unwrap_or_else(|| EntryStatus::Error("engine reported no result".to_string())),
        });
    }
    for index in out_of_range {
        let status = EntryStatus::Error(format!(
            "index {index} out of range (archive has {count} entries)"
        ));
        let path = PathBuf::from(format!("#{index}"));
        tracing::warn!(index, %status, "entry failed");
        state.progress.on_entry_complete(&path, &status);
        result.record(EntryOutcome {
            index,
            path,
            size: 0,
            status,
        });
    }

    state.progress.on_complete();
    result.duration = start.elapsed();

    tracing::info!(
        mode = %mode,
        attempted = result.attempted,
        succeeded = result.succeeded,
        failed = result.failed(),
        duration_ms = u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
        "pass complete"
    );

    Ok(result)
}
