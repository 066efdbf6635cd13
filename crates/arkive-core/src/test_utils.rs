//! Test utilities: in-memory archive builders and a scriptable mock engine.
//!
//! The mock engine follows the same calling convention as a real one, so
//! orchestration logic can be exercised without any container format.
//!
//! # Panics
//!
//! All functions in this module may panic on I/O errors since they are
//! designed for test use only where panics are acceptable.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::cell::RefCell;
use std::io::Cursor;
use std::io::Write;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crate::engine::ArchiveEngine;
use crate::engine::ArchiveHandler;
use crate::engine::ArchiveStream;
use crate::engine::EngineResult;
use crate::engine::EntryProp;
use crate::engine::ExtractMode;
use crate::engine::ExtractProviders;
use crate::engine::FormatProp;
use crate::engine::OperationResult;
use crate::engine::PropValue;
use crate::error::EngineStatus;
use crate::registry::FormatId;

/// Modification time given to every member built by [`create_test_tar`].
pub const TEST_TAR_MTIME: u64 = 1_600_000_000;

/// Creates an in-memory TAR archive from a list of entries.
///
/// Each entry is a tuple of (path, content). A path ending in `/` becomes a
/// directory. Files are created with mode 0o644.
#[must_use]
pub fn create_test_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut ar = tar::Builder::new(Vec::new());
    for &(path, data) in entries {
        let mut header = tar::Header::new_gnu();
        if path.ends_with('/') {
            header.set_entry_type(tar::EntryType::Directory);
            header.set_size(0);
            header.set_mode(0o755);
        } else {
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
        }
        header.set_mtime(TEST_TAR_MTIME);
        header.set_cksum();
        ar.append_data(&mut header, path, data).unwrap();
    }
    ar.into_inner().unwrap()
}

/// Creates an in-memory ZIP archive from a list of entries.
///
/// Each entry is a tuple of (path, content). A path ending in `/` becomes a
/// directory. Files are deflated with mode 0o644.
#[must_use]
pub fn create_test_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    build_zip(entries, None)
}

/// Creates an in-memory ZIP archive whose files are AES-256 encrypted with
/// `password`.
#[must_use]
pub fn create_encrypted_zip(entries: &[(&str, &[u8])], password: &str) -> Vec<u8> {
    build_zip(entries, Some(password))
}

fn build_zip(entries: &[(&str, &[u8])], password: Option<&str>) -> Vec<u8> {
    use zip::write::SimpleFileOptions;
    use zip::write::ZipWriter;

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for &(path, data) in entries {
        if path.ends_with('/') {
            zip.add_directory(path, options).unwrap();
            continue;
        }
        match password {
            Some(password) => {
                let encrypted = options.with_aes_encryption(zip::AesMode::Aes256, password);
                zip.start_file(path, encrypted).unwrap();
            }
            None => zip.start_file(path, options).unwrap(),
        }
        zip.write_all(data).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

/// Creates an in-memory 7z archive, one LZMA2 block per non-empty file.
///
/// A path ending in `/` becomes a directory and empty content becomes an
/// entry without a data stream. With a `password` file data is AES-256
/// encrypted; `encrypt_header` then also encrypts the entry list.
#[must_use]
pub fn create_test_7z(
    entries: &[(&str, &[u8])],
    password: Option<&str>,
    encrypt_header: bool,
) -> Vec<u8> {
    use sevenz_rust2::ArchiveEntry;
    use sevenz_rust2::ArchiveWriter;
    use sevenz_rust2::EncoderMethod;
    use sevenz_rust2::Password;
    use sevenz_rust2::encoder_options::AesEncoderOptions;

    let mut writer = ArchiveWriter::new(Cursor::new(Vec::new())).unwrap();
    if let Some(password) = password {
        writer.set_content_methods(vec![
            AesEncoderOptions::new(Password::from(password)).into(),
            EncoderMethod::LZMA2.into(),
        ]);
    }
    writer.set_encrypt_header(encrypt_header);

    for &(path, data) in entries {
        if let Some(dir) = path.strip_suffix('/') {
            writer
                .push_archive_entry(ArchiveEntry::new_directory(dir), None::<&[u8]>)
                .unwrap();
        } else if data.is_empty() {
            writer
                .push_archive_entry(ArchiveEntry::new_file(path), None::<&[u8]>)
                .unwrap();
        } else {
            writer
                .push_archive_entry(ArchiveEntry::new_file(path), Some(data))
                .unwrap();
        }
    }

    writer.finish().unwrap().into_inner()
}

/// One scripted entry of a [`MockArchive`].
#[derive(Debug, Clone, Default)]
pub struct MockEntry {
    path: Option<String>,
    is_dir: bool,
    data: Vec<u8>,
    mtime: Option<u64>,
    password: Option<String>,
    corrupt: bool,
    failing_property: bool,
    silent: bool,
}

impl MockEntry {
    /// A regular file.
    #[must_use]
    pub fn file(path: &str, data: &[u8]) -> Self {
        Self {
            path: Some(path.to_string()),
            data: data.to_vec(),
            ..Self::default()
        }
    }

    /// A directory.
    #[must_use]
    pub fn dir(path: &str) -> Self {
        Self {
            path: Some(path.to_string()),
            is_dir: true,
            ..Self::default()
        }
    }

    /// A payload without a path, `size` zero bytes long.
    #[must_use]
    pub fn pathless(size: usize) -> Self {
        Self {
            data: vec![0; size],
            ..Self::default()
        }
    }

    /// Every property query for this entry fails.
    #[must_use]
    pub fn with_failing_property(mut self) -> Self {
        self.failing_property = true;
        self
    }

    /// Reports `filetime` as the modification time.
    #[must_use]
    pub fn with_mtime(mut self, filetime: u64) -> Self {
        self.mtime = Some(filetime);
        self
    }

    /// Requires the password `secret`.
    #[must_use]
    pub fn encrypted(self) -> Self {
        self.encrypted_with("secret")
    }

    /// Requires `password`.
    #[must_use]
    pub fn encrypted_with(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    /// Writes the first half of the data, then reports a data error.
    #[must_use]
    pub fn corrupt(mut self) -> Self {
        self.corrupt = true;
        self
    }

    /// Decodes normally but never reports an outcome.
    #[must_use]
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    fn property(&self, prop: EntryProp) -> EngineResult<PropValue> {
        if self.failing_property {
            return Err(EngineStatus::Fail);
        }
        Ok(match prop {
            EntryProp::Path => self.path.clone().map_or(PropValue::Empty, PropValue::Str),
            EntryProp::IsDir => PropValue::Bool(self.is_dir),
            EntryProp::Size | EntryProp::PackedSize => PropValue::U64(self.data.len() as u64),
            EntryProp::IsEncrypted => PropValue::Bool(self.password.is_some()),
            EntryProp::MTime => self.mtime.map_or(PropValue::Empty, PropValue::FileTime),
            EntryProp::Crc | EntryProp::CTime | EntryProp::ATime | EntryProp::Attributes => {
                PropValue::Empty
            }
        })
    }
}

/// Scripted archive content served by [`MockEngine`] handlers.
#[derive(Debug, Clone, Default)]
pub struct MockArchive {
    entries: Vec<MockEntry>,
    failing_entry_count: bool,
    abort_at: Option<u32>,
    sink_log: Arc<Mutex<Vec<(u32, bool)>>>,
}

impl MockArchive {
    /// An archive with no entries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    #[must_use]
    pub fn with_entry(mut self, entry: MockEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// The entry count query fails.
    #[must_use]
    pub fn with_failing_entry_count(mut self) -> Self {
        self.failing_entry_count = true;
        self
    }

    /// Extraction returns an error when it reaches `index`, before asking
    /// for its sink.
    #[must_use]
    pub fn aborting_at(mut self, index: u32) -> Self {
        self.abort_at = Some(index);
        self
    }

    /// Every sink request so far as `(index, sink_was_supplied)`, shared by
    /// all clones of this archive.
    pub fn sink_requests(&self) -> Vec<(u32, bool)> {
        self.sink_log.lock().unwrap().clone()
    }

    /// An already opened handler over this archive.
    #[must_use]
    pub fn into_handler(self) -> Box<dyn ArchiveHandler> {
        Box::new(MockHandler {
            archive: Some(self.clone()),
            source: self,
        })
    }
}

/// Handler returned by [`MockEngine::instantiate`].
#[derive(Debug)]
pub struct MockHandler {
    source: MockArchive,
    archive: Option<MockArchive>,
}

impl MockHandler {
    fn opened(&self) -> EngineResult<&MockArchive> {
        self.archive.as_ref().ok_or(EngineStatus::Fail)
    }
}

impl ArchiveHandler for MockHandler {
    fn open(
        &mut self,
        _stream: ArchiveStream,
        _probe_bound: u64,
        _password: Option<&str>,
    ) -> EngineResult<()> {
        self.archive = Some(self.source.clone());
        Ok(())
    }

    fn entry_count(&self) -> EngineResult<u32> {
        let archive = self.opened()?;
        if archive.failing_entry_count {
            return Err(EngineStatus::Fail);
        }
        Ok(u32::try_from(archive.entries.len()).unwrap())
    }

    fn entry_property(&self, index: u32, prop: EntryProp) -> EngineResult<PropValue> {
        self.opened()?
            .entries
            .get(index as usize)
            .ok_or(EngineStatus::InvalidParam)?
            .property(prop)
    }

    fn extract(
        &mut self,
        indices: &[u32],
        mode: ExtractMode,
        providers: &mut ExtractProviders<'_>,
    ) -> EngineResult<()> {
        let archive = self.opened()?;
        let mut completed = 0u64;

        for &index in indices {
            if archive.abort_at == Some(index) {
                return Err(EngineStatus::Archive(format!("mock abort at {index}")));
            }
            let entry = archive
                .entries
                .get(index as usize)
                .ok_or(EngineStatus::InvalidParam)?;

            let sink = (providers.sink)(index, mode);
            archive
                .sink_log
                .lock()
                .unwrap()
                .push((index, sink.is_some()));

            let result = if entry.is_dir {
                OperationResult::Ok
            } else if entry
                .password
                .as_ref()
                .is_some_and(|required| (providers.password)().as_ref() != Some(required))
            {
                OperationResult::WrongPassword
            } else {
                let data = if entry.corrupt {
                    &entry.data[..entry.data.len() / 2]
                } else {
                    &entry.data[..]
                };
                let mut result = if entry.corrupt {
                    OperationResult::DataError
                } else {
                    OperationResult::Ok
                };
                match sink {
                    Some(mut writer) => {
                        if writer.write_all(data).is_err() {
                            result = OperationResult::DataError;
                        }
                        completed += data.len() as u64;
                        (providers.progress)(completed);
                    }
                    None if mode == ExtractMode::TestOnly => {
                        completed += data.len() as u64;
                        (providers.progress)(completed);
                    }
                    None => {}
                }
                result
            };

            if !entry.silent {
                (providers.outcome)(index, result);
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        self.archive = None;
    }
}

/// Handler whose open always fails.
struct FailingHandler;

impl ArchiveHandler for FailingHandler {
    fn open(
        &mut self,
        _stream: ArchiveStream,
        _probe_bound: u64,
        _password: Option<&str>,
    ) -> EngineResult<()> {
        Err(EngineStatus::Archive("mock open failure".to_string()))
    }

    fn entry_count(&self) -> EngineResult<u32> {
        Err(EngineStatus::Fail)
    }

    fn entry_property(&self, _index: u32, _prop: EntryProp) -> EngineResult<PropValue> {
        Err(EngineStatus::Fail)
    }

    fn extract(
        &mut self,
        _indices: &[u32],
        _mode: ExtractMode,
        _providers: &mut ExtractProviders<'_>,
    ) -> EngineResult<()> {
        Err(EngineStatus::Fail)
    }

    fn close(&mut self) {}
}

/// One format advertised by a [`MockEngine`]. Its format id is the name's
/// bytes.
#[derive(Debug, Clone)]
pub struct MockFormat {
    name: String,
    extensions: String,
    add_extensions: Option<String>,
    flags: u32,
    time_flags: u32,
    has_id: bool,
    failing_open: bool,
    archive: MockArchive,
}

impl MockFormat {
    /// A format with a space-separated extension list.
    #[must_use]
    pub fn new(name: &str, extensions: &str) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions.to_string(),
            add_extensions: None,
            flags: 0,
            time_flags: 0,
            has_id: true,
            failing_open: false,
            archive: MockArchive::new(),
        }
    }

    /// Sets the alternate extension list.
    #[must_use]
    pub fn with_add_extensions(mut self, list: &str) -> Self {
        self.add_extensions = Some(list.to_string());
        self
    }

    /// Sets the capability flags.
    #[must_use]
    pub const fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Sets the timestamp flags.
    #[must_use]
    pub const fn with_time_flags(mut self, time_flags: u32) -> Self {
        self.time_flags = time_flags;
        self
    }

    /// Reports no class id, making the format display-only.
    #[must_use]
    pub const fn without_format_id(mut self) -> Self {
        self.has_id = false;
        self
    }

    /// Handlers for this format fail to open.
    #[must_use]
    pub const fn with_failing_open(mut self) -> Self {
        self.failing_open = true;
        self
    }

    /// Content served when this format is opened.
    #[must_use]
    pub fn with_archive(mut self, archive: MockArchive) -> Self {
        self.archive = archive;
        self
    }
}

/// Scriptable [`ArchiveEngine`].
#[derive(Debug, Default)]
pub struct MockEngine {
    formats: Vec<MockFormat>,
    failing_count: bool,
    count_calls: AtomicUsize,
}

impl MockEngine {
    /// An engine with no formats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertises another format.
    #[must_use]
    pub fn with_format(mut self, format: MockFormat) -> Self {
        self.formats.push(format);
        self
    }

    /// The format count query fails.
    #[must_use]
    pub fn with_failing_format_count(mut self) -> Self {
        self.failing_count = true;
        self
    }

    /// How many times the format count was queried.
    pub fn format_count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }
}

impl ArchiveEngine for MockEngine {
    fn format_count(&self) -> EngineResult<u32> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_count {
            return Err(EngineStatus::Fail);
        }
        Ok(u32::try_from(self.formats.len()).unwrap())
    }

    fn format_property(&self, index: u32, prop: FormatProp) -> EngineResult<PropValue> {
        let format = self
            .formats
            .get(index as usize)
            .ok_or(EngineStatus::InvalidParam)?;
        Ok(match prop {
            FormatProp::Name => PropValue::Str(format.name.clone()),
            FormatProp::Extension => PropValue::Str(format.extensions.clone()),
            FormatProp::AddExtension => format
                .add_extensions
                .clone()
                .map_or(PropValue::Empty, PropValue::Str),
            FormatProp::Flags => PropValue::U32(format.flags),
            FormatProp::TimeFlags => PropValue::U32(format.time_flags),
            FormatProp::ClassId if format.has_id => PropValue::Bytes(format.name.as_bytes().to_vec()),
            FormatProp::ClassId => PropValue::Empty,
        })
    }

    fn instantiate(&self, id: &FormatId) -> EngineResult<Box<dyn ArchiveHandler>> {
        let format = self
            .formats
            .iter()
            .find(|format| format.has_id && format.name.as_bytes() == id.as_bytes())
            .ok_or(EngineStatus::Unsupported)?;
        if format.failing_open {
            return Ok(Box::new(FailingHandler));
        }
        Ok(Box::new(MockHandler {
            source: format.archive.clone(),
            archive: None,
        }))
    }
}

/// In-memory sink shared between a pass and the test inspecting it.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Everything a handler reported during one [`collect_pass`] call.
#[derive(Debug)]
pub struct CollectedPass {
    /// Return value of the extract call.
    pub status: EngineResult<()>,
    /// Outcomes in reporting order.
    pub outcomes: Vec<(u32, OperationResult)>,
    /// Indices whose sink was requested, in order.
    pub sink_requests: Vec<u32>,
    /// Last cumulative progress value, if any was reported.
    pub last_progress: Option<u64>,
    buffers: Vec<(u32, SharedBuffer)>,
}

impl CollectedPass {
    /// Data written for `index`; empty if no sink was handed out.
    pub fn data(&self, index: u32) -> Vec<u8> {
        self.buffers
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, buffer)| buffer.contents())
            .unwrap_or_default()
    }
}

/// Drives `handler.extract` directly with in-memory sinks (extract mode)
/// or no sinks (test mode), recording every callback.
pub fn collect_pass(
    handler: &mut dyn ArchiveHandler,
    indices: &[u32],
    mode: ExtractMode,
    password: Option<&str>,
) -> CollectedPass {
    let mut outcomes = Vec::new();
    let mut sink_requests = Vec::new();
    let mut buffers = Vec::new();
    let mut last_progress = None;
    let password = password.map(str::to_string);

    let status = {
        let mut sink = |index: u32, mode: ExtractMode| -> Option<Box<dyn Write>> {
            sink_requests.push(index);
            if mode == ExtractMode::TestOnly {
                return None;
            }
            let buffer = SharedBuffer::default();
            buffers.push((index, buffer.clone()));
            Some(Box::new(buffer))
        };
        let mut outcome = |index: u32, result: OperationResult| outcomes.push((index, result));
        let password_provider = || password.clone();
        let mut progress = |completed: u64| last_progress = Some(completed);
        let mut providers = ExtractProviders {
            sink: &mut sink,
            outcome: &mut outcome,
            password: &password_provider,
            progress: &mut progress,
        };
        handler.extract(indices, mode, &mut providers)
    };

    CollectedPass {
        status,
        outcomes,
        sink_requests,
        last_progress,
        buffers,
    }
}
