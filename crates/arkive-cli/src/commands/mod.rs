//! Subcommand implementations.
//!
//! Each command returns `Ok(true)` on full success and `Ok(false)` when it
//! ran but some item failed.

pub mod completion;
pub mod extract;
pub mod formats;
pub mod info;
pub mod list;
