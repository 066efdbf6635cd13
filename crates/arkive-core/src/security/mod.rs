//! Destination path safety.

pub mod path;

pub use path::UnsafePath;
pub use path::sanitize_entry_path;
