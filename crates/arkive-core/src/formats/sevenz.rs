//! 7z handler.
//!
//! Metadata is read once on open. Archives with encrypted headers need the
//! password at that point; entry data is decoded with the password
//! provider's credential.
//!
//! Streamed entries live in blocks, and a block decodes front to back, so
//! extraction walks each block that holds a requested entry and discards the
//! entries around it. Entries without data (directories, empty files) belong
//! to no block and are reported in between, keeping index order.

use std::collections::VecDeque;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

use sevenz_rust2::Archive;
use sevenz_rust2::ArchiveEntry;
use sevenz_rust2::Block;
use sevenz_rust2::BlockDecoder;
use sevenz_rust2::Password;

use crate::engine::ArchiveHandler;
use crate::engine::ArchiveStream;
use crate::engine::EngineResult;
use crate::engine::EntryProp;
use crate::engine::ExtractMode;
use crate::engine::ExtractProviders;
use crate::engine::OperationResult;
use crate::engine::PropValue;
use crate::error::EngineStatus;

use super::common::CachedEntry;
use super::common::Delivery;
use super::common::EntryTable;
use super::common::classify_read_error;
use super::common::mentions_password;
use super::detect;

/// Coder id of 7z's AES-256 + SHA-256 filter.
const AES_METHOD_ID: &[u8] = &[0x06, 0xF1, 0x07, 0x01];

/// Handler for 7z archives.
#[derive(Default)]
pub struct SevenZHandler {
    stream: Option<ArchiveStream>,
    archive: Option<Archive>,
    entries: EntryTable,
}

impl SevenZHandler {
    /// Creates a closed handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_encrypted(block: &Block) -> bool {
    block
        .coders
        .iter()
        .any(|coder| coder.encoder_method_id() == AES_METHOD_ID)
}

fn cache_entry(entry: &ArchiveEntry, block: Option<&Block>) -> CachedEntry {
    CachedEntry {
        path: Some(entry.name.clone()),
        is_dir: entry.is_directory(),
        size: Some(entry.size),
        packed_size: None,
        crc: entry
            .has_crc
            .then(|| u32::try_from(entry.crc).ok())
            .flatten(),
        encrypted: entry.has_stream && block.is_some_and(is_encrypted),
        mtime: entry
            .has_last_modified_date
            .then(|| u64::from(entry.last_modified_date)),
        attributes: entry
            .has_windows_attributes
            .then_some(entry.windows_attributes),
    }
}

/// Reads the archive metadata.
///
/// A wrong password on an encrypted header does not fail with a password
/// error, it yields an undecodable header. When that happens with a
/// password supplied, the header is re-read without one to tell the two
/// apart.
fn read_archive(stream: &mut ArchiveStream, password: Option<&str>) -> EngineResult<Archive> {
    let credential = password.map_or_else(Password::empty, Password::from);
    let err = match Archive::read(stream, &credential) {
        Ok(archive) => return Ok(archive),
        Err(err) => err,
    };

    let reason = err.to_string();
    if mentions_password(&reason) {
        return Err(EngineStatus::WrongPassword);
    }
    if password.is_some() {
        stream.seek(SeekFrom::Start(0))?;
        if matches!(
            Archive::read(stream, &Password::empty()),
            Err(sevenz_rust2::Error::PasswordRequired)
        ) {
            return Err(EngineStatus::WrongPassword);
        }
    }
    Err(EngineStatus::Archive(format!("failed to open 7z archive: {reason}")))
}

/// State of one extract call, shared by every block walked.
struct Walk<'w, 'p> {
    entries: &'w [CachedEntry],
    wanted: Vec<bool>,
    /// Requested entries outside any block, ascending.
    unblocked: VecDeque<u32>,
    /// Index of the next entry the current block decoder yields.
    next: usize,
    mode: ExtractMode,
    password_given: bool,
    delivery: Delivery,
    providers: &'w mut ExtractProviders<'p>,
}

impl Walk<'_, '_> {
    fn is_wanted(&self, index: usize) -> bool {
        self.wanted.get(index).copied().unwrap_or(false)
    }

    /// Reports the requested block-less entries that precede `index`.
    fn report_unblocked_before(&mut self, index: usize) {
        while let Some(&front) = self.unblocked.front() {
            if front as usize >= index {
                break;
            }
            self.unblocked.pop_front();
            let sink = (self.providers.sink)(front, self.mode);
            let result = self
                .delivery
                .stream(&mut std::io::empty(), sink, self.providers.progress);
            (self.providers.outcome)(front, result);
        }
    }

    /// Handles the entry the block decoder just yielded.
    fn on_entry(&mut self, data: &mut dyn Read) {
        let index = self.next;
        self.next += 1;
        self.report_unblocked_before(index);

        if !self.is_wanted(index) {
            if let Err(e) = self.delivery.drain(data) {
                tracing::debug!(index, error = %e, "cannot skip 7z entry");
            }
            return;
        }
        let Some((is_dir, encrypted)) = self.entries.get(index).map(|e| (e.is_dir, e.encrypted))
        else {
            return;
        };
        let Ok(reported) = u32::try_from(index) else {
            return;
        };

        let sink = (self.providers.sink)(reported, self.mode);
        let result = if is_dir {
            OperationResult::Ok
        } else if sink.is_none() && self.mode == ExtractMode::Extract {
            match self.delivery.drain(data) {
                Ok(_) => OperationResult::Ok,
                Err(e) => classify_read_error(&e),
            }
        } else {
            self.delivery.stream(data, sink, self.providers.progress)
        };
        let result = match result {
            OperationResult::DataError if encrypted && self.password_given => {
                OperationResult::WrongPassword
            }
            other => other,
        };
        (self.providers.outcome)(reported, result);
    }

    /// Fails the requested entries of a block that could not be decoded.
    fn fail_block(&mut self, end: usize, result: OperationResult) {
        for index in self.next..end {
            self.report_unblocked_before(index);
            if !self.is_wanted(index) {
                continue;
            }
            let Ok(reported) = u32::try_from(index) else {
                continue;
            };
            drop((self.providers.sink)(reported, self.mode));
            (self.providers.outcome)(reported, result);
        }
        self.next = end;
    }
}

impl ArchiveHandler for SevenZHandler {
    fn open(
        &mut self,
        mut stream: ArchiveStream,
        _probe_bound: u64,
        password: Option<&str>,
    ) -> EngineResult<()> {
        self.close();

        if !detect::starts_with_any(&mut stream, &[detect::SEVENZ_MAGIC])? {
            return Err(detect::not_recognised("7z"));
        }

        let archive = read_archive(&mut stream, password)?;
        let entries: Vec<CachedEntry> = archive
            .files
            .iter()
            .zip(&archive.stream_map.file_block_index)
            .map(|(entry, &block)| {
                cache_entry(entry, block.and_then(|b| archive.blocks.get(b)))
            })
            .collect();
        stream.seek(SeekFrom::Start(0))?;

        tracing::debug!(
            entries = entries.len(),
            blocks = archive.blocks.len(),
            solid = archive.is_solid,
            "opened 7z archive"
        );
        self.entries.set(entries);
        self.archive = Some(archive);
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
        let archive = self.archive.as_ref().ok_or(EngineStatus::Fail)?;
        let entries = self.entries.entries()?;

        let mut wanted = vec![false; entries.len()];
        for &index in indices {
            *wanted
                .get_mut(index as usize)
                .ok_or(EngineStatus::InvalidParam)? = true;
        }
        let block_of = &archive.stream_map.file_block_index;
        let unblocked = (0..entries.len())
            .filter(|&i| wanted[i] && block_of.get(i).copied().flatten().is_none())
            .filter_map(|i| u32::try_from(i).ok())
            .collect();

        let credential = (providers.password)();
        let password = credential
            .as_deref()
            .map_or_else(Password::empty, Password::from);
        let mut walk = Walk {
            entries,
            wanted,
            unblocked,
            next: 0,
            mode,
            password_given: credential.is_some(),
            delivery: Delivery::new(),
            providers,
        };

        for (block_index, block) in archive.blocks.iter().enumerate() {
            let decoder = BlockDecoder::new(1, block_index, archive, &password, &mut *stream);
            let start = archive
                .stream_map
                .block_first_file_index
                .get(block_index)
                .copied()
                .unwrap_or(0);
            let end = start + decoder.entry_count();
            if !(start..end).any(|i| walk.is_wanted(i)) {
                continue;
            }

            walk.next = start;
            let decoded = decoder.for_each_entries(&mut |_entry, data| {
                walk.on_entry(data);
                Ok(true)
            });
            if let Err(e) = decoded {
                let reason = e.to_string();
                let result = if mentions_password(&reason) || is_encrypted(block) {
                    OperationResult::WrongPassword
                } else {
                    OperationResult::DataError
                };
                tracing::debug!(block = block_index, error = %reason, "cannot decode 7z block");
                walk.fail_block(end, result);
            }
        }
        walk.report_unblocked_before(usize::MAX);
        Ok(())
    }

    fn close(&mut self) {
        self.stream = None;
        self.archive = None;
        self.entries.clear();
    }
}
