//! Archive format registry and per-entry extraction orchestrator.
//!
//! `arkive-core` resolves a file to an archive format by extension, opens it
//! through an archive engine and runs extract or test passes entry by entry.
//! A failing entry (corrupt data, wrong password, unsafe path) is recorded
//! and the pass moves on; only an unreadable entry table aborts it.
//!
//! The engine is pluggable through [`engine::ArchiveEngine`]. The bundled
//! [`BuiltinEngine`] handles 7z, zip, tar, gzip, bzip2, xz and zstd.
//!
//! # Examples
//!
//! ```no_run
//! use arkive_core::extract_archive;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let result = extract_archive("archive.tar.gz", "/output/dir", None)?;
//! println!("{} ok, {} failed", result.succeeded, result.failed());
//! # Ok(())
//! # }
//! ```
//!
//! Sessions give full control over registry, engine and passes:
//!
//! ```no_run
//! use arkive_core::BuiltinEngine;
//! use arkive_core::ExtractionConfig;
//! use arkive_core::ExtractionSession;
//! use arkive_core::NoopProgress;
//! use arkive_core::Selection;
//! use arkive_core::builtin_registry;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = BuiltinEngine::new();
//! let mut session = ExtractionSession::open(
//!     builtin_registry(),
//!     &engine,
//!     Path::new("photos.zip"),
//!     ExtractionConfig::default(),
//! )?;
//! session.set_password(Some("hunter2"));
//! let tested = session.test(&Selection::All, &mut NoopProgress)?;
//! if !tested.had_failures() {
//!     session.extract(Path::new("out"), &Selection::All, &mut NoopProgress)?;
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod archive;
pub mod config;
pub mod engine;
pub mod error;
pub mod extraction;
pub mod formats;
pub mod inspection;
pub mod interop;
pub mod io;
pub mod registry;
pub mod report;
pub mod security;
pub mod timestamp;

#[doc(hidden)]
pub mod test_utils;

// Re-export main API types
pub use api::engine_version;
pub use api::extract_archive;
pub use api::extract_archive_with_progress;
pub use api::is_supported_extension;
pub use api::list_archive;
pub use api::list_supported_format_names;
pub use api::lookup_format;
pub use api::open_session;
pub use api::test_archive;
pub use archive::ArchiveBuilder;
pub use config::ExtractionConfig;
pub use engine::BuiltinEngine;
pub use engine::ExtractMode;
pub use error::ArchiveError;
pub use error::EngineStatus;
pub use error::Result;
pub use extraction::ExtractionSession;
pub use extraction::OpenedArchive;
pub use extraction::SessionState;
pub use extraction::Selection;
pub use extraction::resolve_and_open;
pub use registry::FormatDescriptor;
pub use registry::FormatId;
pub use registry::FormatRegistry;
pub use registry::RegistryCache;
pub use registry::builtin_registry;
pub use report::ByteProgress;
pub use report::EntryOutcome;
pub use report::EntryStatus;
pub use report::NoopProgress;
pub use report::PassResult;
pub use report::ProgressCallback;
