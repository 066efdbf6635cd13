//! Helpers shared by the bundled format handlers.

use std::io::ErrorKind;
use std::io::Read;
use std::io::Write;

use crate::engine::EngineResult;
use crate::engine::EntryProp;
use crate::engine::ExtractMode;
use crate::engine::ExtractProviders;
use crate::engine::OperationResult;
use crate::engine::PropValue;
use crate::error::EngineStatus;
use crate::io::CopyBuffer;
use crate::io::copy_with_progress;

/// Entry metadata cached when the archive is opened, so property queries
/// never touch the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CachedEntry {
    pub path: Option<String>,
    pub is_dir: bool,
    pub size: Option<u64>,
    pub packed_size: Option<u64>,
    pub crc: Option<u32>,
    pub encrypted: bool,
    pub mtime: Option<u64>,
    pub attributes: Option<u32>,
}

impl CachedEntry {
    pub(crate) fn property(&self, prop: EntryProp) -> PropValue {
        match prop {
            EntryProp::Path => self
                .path
                .clone()
                .map_or(PropValue::Empty, PropValue::Str),
            EntryProp::IsDir => PropValue::Bool(self.is_dir),
            EntryProp::Size => self.size.map_or(PropValue::Empty, PropValue::U64),
            EntryProp::PackedSize => self.packed_size.map_or(PropValue::Empty, PropValue::U64),
            EntryProp::Crc => self.crc.map_or(PropValue::Empty, PropValue::U32),
            EntryProp::IsEncrypted => PropValue::Bool(self.encrypted),
            EntryProp::MTime => self.mtime.map_or(PropValue::Empty, PropValue::FileTime),
            EntryProp::Attributes => self.attributes.map_or(PropValue::Empty, PropValue::U32),
            EntryProp::CTime | EntryProp::ATime => PropValue::Empty,
        }
    }
}

/// Entry table of an opened handler.
#[derive(Debug, Default)]
pub(crate) struct EntryTable {
    entries: Option<Vec<CachedEntry>>,
}

impl EntryTable {
    pub(crate) fn set(&mut self, entries: Vec<CachedEntry>) {
        self.entries = Some(entries);
    }

    pub(crate) fn clear(&mut self) {
        self.entries = None;
    }

    pub(crate) fn entries(&self) -> EngineResult<&[CachedEntry]> {
        self.entries.as_deref().ok_or(EngineStatus::Fail)
    }

    pub(crate) fn count(&self) -> EngineResult<u32> {
        u32::try_from(self.entries()?.len()).map_err(|_| EngineStatus::Unsupported)
    }

    pub(crate) fn property(&self, index: u32, prop: EntryProp) -> EngineResult<PropValue> {
        self.entries()?
            .get(index as usize)
            .map(|entry| entry.property(prop))
            .ok_or(EngineStatus::InvalidParam)
    }
}

/// Running state of one handler extract call.
pub(crate) struct Delivery {
    buffer: CopyBuffer,
    completed: u64,
}

impl Delivery {
    pub(crate) fn new() -> Self {
        Self {
            buffer: CopyBuffer::new(),
            completed: 0,
        }
    }

    /// Asks for a sink for `index`, streams `reader` into it (or into
    /// nothing) and reports the outcome.
    ///
    /// With `skip_unwanted`, an extract-mode entry without a sink is not
    /// decoded at all.
    pub(crate) fn deliver(
        &mut self,
        index: u32,
        reader: &mut dyn Read,
        mode: ExtractMode,
        skip_unwanted: bool,
        providers: &mut ExtractProviders<'_>,
    ) {
        let sink = (providers.sink)(index, mode);
        if sink.is_none() && mode == ExtractMode::Extract && skip_unwanted {
            (providers.outcome)(index, OperationResult::Ok);
            return;
        }
        let result = self.stream(reader, sink, providers.progress);
        (providers.outcome)(index, result);
    }

    /// Streams without asking for a sink, discarding the data. Used to move
    /// past entries outside the selection in sequential formats.
    pub(crate) fn drain(&mut self, reader: &mut dyn Read) -> std::io::Result<u64> {
        let mut ignored = 0;
        copy_with_progress(
            reader,
            &mut std::io::sink(),
            &mut self.buffer,
            &mut ignored,
            &mut |_| {},
        )
    }

    /// Streams `reader` into an already requested sink, or discards it.
    pub(crate) fn stream(
        &mut self,
        reader: &mut dyn Read,
        sink: Option<Box<dyn Write>>,
        progress: &mut dyn FnMut(u64),
    ) -> OperationResult {
        let copied = match sink {
            Some(mut writer) => copy_with_progress(
                reader,
                &mut writer,
                &mut self.buffer,
                &mut self.completed,
                progress,
            )
            .and_then(|_| writer.flush()),
            None => copy_with_progress(
                reader,
                &mut std::io::sink(),
                &mut self.buffer,
                &mut self.completed,
                progress,
            )
            .map(|_| ()),
        };
        match copied {
            Ok(()) => OperationResult::Ok,
            Err(e) => classify_read_error(&e),
        }
    }
}

/// Maps a decode error to an entry outcome.
pub(crate) fn classify_read_error(err: &std::io::Error) -> OperationResult {
    if err.kind() == ErrorKind::PermissionDenied || mentions_password(&err.to_string()) {
        OperationResult::WrongPassword
    } else {
        OperationResult::DataError
    }
}

/// Returns `true` if an error message points at a missing or bad password.
pub(crate) fn mentions_password(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("password") || lower.contains("decrypt")
}

/// 16-byte class id `23170F69-40C1-278A-1000-000110XX0000` in GUID byte
/// order, with handler byte `XX`.
pub(crate) const fn class_id(handler: u8) -> [u8; 16] {
    [
        0x69, 0x0F, 0x17, 0x23, 0xC1, 0x40, 0x8A, 0x27, 0x10, 0x00, 0x00, 0x01, 0x10, handler,
        0x00, 0x00,
    ]
}
