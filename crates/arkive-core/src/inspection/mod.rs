//! Archive inspection without extraction.

pub mod list;

pub use list::ArchiveListing;
pub use list::ArchiveSummary;
pub use list::EntryInfo;
