//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use super::formatter::Resolution;
use anyhow::Result;
use arkive_core::EntryStatus;
use arkive_core::FormatDescriptor;
use arkive_core::PassResult;
use arkive_core::inspection::ArchiveListing;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct EntryOutput {
    index: u32,
    path: String,
    size: u64,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl EntryOutput {
    fn from_status(index: u32, path: &Path, size: u64, status: &EntryStatus) -> Self {
        let (status, reason) = match status {
            EntryStatus::Ok => ("ok", None),
            EntryStatus::Skipped => ("skipped", None),
            EntryStatus::Error(reason) => ("error", Some(reason.clone())),
            EntryStatus::WrongPassword => ("wrong_password", None),
        };
        Self {
            index,
            path: path.display().to_string(),
            size,
            status,
            reason,
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_pass_result(&self, archive: &Path, result: &PassResult) -> Result<()> {
        #[derive(Serialize)]
        struct PassOutput {
            archive: String,
            attempted: usize,
            succeeded: usize,
            skipped: usize,
            errors: usize,
            wrong_password: usize,
            total_bytes: u64,
            completed_bytes: u64,
            bytes_written: u64,
            duration_ms: u128,
            entries: Vec<EntryOutput>,
        }

        let data = PassOutput {
            archive: archive.display().to_string(),
            attempted: result.attempted,
            succeeded: result.succeeded,
            skipped: result.skipped,
            errors: result.errors,
            wrong_password: result.wrong_password,
            total_bytes: result.total_bytes,
            completed_bytes: result.completed_bytes,
            bytes_written: result.bytes_written,
            duration_ms: result.duration.as_millis(),
            entries: result
                .entries
                .iter()
                .map(|e| EntryOutput::from_status(e.index, &e.path, e.size, &e.status))
                .collect(),
        };

        let operation = result.mode.to_string();
        if result.had_failures() {
            let message = format!("{} of {} entries failed", result.failed(), result.attempted);
            Self::output(&JsonOutput::partial(operation, data, message))
        } else {
            Self::output(&JsonOutput::success(operation, data))
        }
    }

    fn format_listing(
        &self,
        listing: &ArchiveListing,
        _long: bool,
        _human_readable: bool,
    ) -> Result<()> {
        #[derive(Serialize)]
        struct ListedEntry {
            index: u32,
            path: Option<String>,
            is_dir: bool,
            size: u64,
            packed_size: Option<u64>,
            crc: Option<u32>,
            encrypted: bool,
            modified_unix: Option<i64>,
            attributes: Option<u32>,
        }

        #[derive(Serialize)]
        struct ListOutput {
            format: String,
            entry_count: u32,
            directories: u32,
            total_size: u64,
            total_packed: u64,
            any_encrypted: bool,
            unreadable: u32,
            entries: Vec<ListedEntry>,
        }

        let summary = &listing.summary;
        let data = ListOutput {
            format: summary.format.clone(),
            entry_count: summary.entry_count,
            directories: summary.directories,
            total_size: summary.total_size,
            total_packed: summary.total_packed,
            any_encrypted: summary.any_encrypted,
            unreadable: listing.unreadable,
            entries: listing
                .entries
                .iter()
                .map(|e| ListedEntry {
                    index: e.index,
                    path: e.path.clone(),
                    is_dir: e.is_dir,
                    size: e.size,
                    packed_size: e.packed_size,
                    crc: e.crc,
                    encrypted: e.encrypted,
                    modified_unix: e.mtime.map(|ft| arkive_core::timestamp::to_unix(ft).0),
                    attributes: e.attributes,
                })
                .collect(),
        };

        Self::output(&JsonOutput::success("list", data))
    }

    fn format_formats(&self, formats: &[&FormatDescriptor]) -> Result<()> {
        #[derive(Serialize)]
        struct FormatOutput {
            name: String,
            extensions: Vec<String>,
            add_extensions: Vec<String>,
            flags: u32,
            time_flags: u32,
            class_id: Option<String>,
        }

        let data: Vec<FormatOutput> = formats
            .iter()
            .map(|d| FormatOutput {
                name: d.name().to_string(),
                extensions: d.extensions().to_vec(),
                add_extensions: d.add_extensions().to_vec(),
                flags: d.flags(),
                time_flags: d.time_flags(),
                class_id: d.format_id().map(|id| {
                    id.as_bytes().iter().map(|b| format!("{b:02x}")).collect()
                }),
            })
            .collect();

        Self::output(&JsonOutput::success("formats", data))
    }

    fn format_resolutions(&self, resolutions: &[Resolution]) -> Result<()> {
        Self::output(&JsonOutput::success("info", resolutions))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_status_serialization() {
        let entry = EntryOutput::from_status(
            2,
            Path::new("a/b.txt"),
            10,
            &EntryStatus::Error("data error".into()),
        );
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"status\":\"error\""));
        assert!(json.contains("\"reason\":\"data error\""));

        let ok = EntryOutput::from_status(0, Path::new("x"), 0, &EntryStatus::Ok);
        let json = serde_json::to_string(&ok).unwrap();
        assert!(!json.contains("reason"));
    }

    #[test]
    fn test_partial_status() {
        let output = JsonOutput::partial("test", 1u32, "1 of 2 entries failed");
        let json = serde_json::to_string(&output).unwrap();
        assert!(json.contains("\"status\":\"partial\""));
        assert!(json.contains("\"error\":\"1 of 2 entries failed\""));
    }
}
