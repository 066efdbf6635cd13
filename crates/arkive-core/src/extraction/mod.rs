//! Extraction orchestration.
//!
//! [`resolve_and_open`] maps a path to a format and opens it;
//! [`ExtractionSession`] owns the opened archive and runs extract or test
//! passes over it, one entry at a time, tolerating per-entry failures.

mod pass;
mod session;
mod stream;

pub use pass::Selection;
pub use session::ExtractionSession;
pub use session::OpenedArchive;
pub use session::SessionState;
pub use session::resolve_and_open;
