//! Zip handler.
//!
//! Entries are random-access, so extraction opens only the requested
//! indices. Encrypted entries (ZipCrypto or AES) are decrypted with the
//! password provider's credential.

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
use super::common::mentions_password;
use super::detect;

type Archive = zip::ZipArchive<ArchiveStream>;

/// Handler for zip and its many renamed variants (jar, docx, epub, ...).
#[derive(Default)]
pub struct ZipHandler {
    archive: Option<Archive>,
    entries: EntryTable,
}

impl ZipHandler {
    /// Creates a closed handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn cache_entry(file: &zip::read::ZipFile<'_, ArchiveStream>) -> CachedEntry {
    let mtime = file.last_modified().and_then(|dt| {
        timestamp::from_civil(
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
        )
    });
    CachedEntry {
        path: Some(file.name().to_string()),
        is_dir: file.is_dir(),
        size: Some(file.size()),
        packed_size: Some(file.compressed_size()),
        crc: Some(file.crc32()),
        encrypted: file.encrypted(),
        mtime,
        attributes: file.unix_mode(),
    }
}

fn classify_zip_error(err: &zip::result::ZipError) -> OperationResult {
    match err {
        zip::result::ZipError::InvalidPassword => OperationResult::WrongPassword,
        other if mentions_password(&other.to_string()) => OperationResult::WrongPassword,
        _ => OperationResult::DataError,
    }
}

impl ArchiveHandler for ZipHandler {
    fn open(
        &mut self,
        mut stream: ArchiveStream,
        probe_bound: u64,
        _password: Option<&str>,
    ) -> EngineResult<()> {
        self.close();

        let signatures = [detect::ZIP_LOCAL_MAGIC, detect::ZIP_EMPTY_MAGIC];
        if detect::find_signature(&mut stream, &signatures, probe_bound)?.is_none() {
            return Err(detect::not_recognised("zip"));
        }

        let mut archive = zip::ZipArchive::new(stream)
            .map_err(|e| EngineStatus::Archive(format!("failed to open zip archive: {e}")))?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let file = archive.by_index_raw(index).map_err(|e| {
                EngineStatus::Archive(format!("failed to read zip entry {index}: {e}"))
            })?;
            entries.push(cache_entry(&file));
        }

        tracing::debug!(entries = entries.len(), "opened zip archive");
        self.entries.set(entries);
        self.archive = Some(archive);
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
        let archive = self.archive.as_mut().ok_or(EngineStatus::Fail)?;
        let entries = self.entries.entries()?;
        let mut delivery = Delivery::new();

        for &index in indices {
            let entry = entries
                .get(index as usize)
                .ok_or(EngineStatus::InvalidParam)?;

            let sink = (providers.sink)(index, mode);
            if entry.is_dir || (sink.is_none() && mode == ExtractMode::Extract) {
                (providers.outcome)(index, OperationResult::Ok);
                continue;
            }

            let opened = if entry.encrypted {
                match (providers.password)() {
                    Some(password) => archive.by_index_decrypt(index as usize, password.as_bytes()),
                    None => {
                        (providers.outcome)(index, OperationResult::WrongPassword);
                        continue;
                    }
                }
            } else {
                archive.by_index(index as usize)
            };

            let result = match opened {
                Ok(mut file) => delivery.stream(&mut file, sink, providers.progress),
                Err(e) => {
                    tracing::debug!(index, error = %e, "cannot open zip entry");
                    classify_zip_error(&e)
                }
            };
            (providers.outcome)(index, result);
        }
        Ok(())
    }

    fn close(&mut self) {
        self.archive = None;
        self.entries.clear();
    }
}
