//! Format handlers of the bundled engine.
//!
//! Each handler implements [`ArchiveHandler`](crate::engine::ArchiveHandler)
//! for one container or codec on top of the corresponding crate.

pub mod compression;
pub mod detect;
pub mod sevenz;
pub mod tar;
pub mod zip;

pub(crate) mod common;

pub use compression::Codec;
pub use compression::StreamHandler;
pub use sevenz::SevenZHandler;
pub use tar::TarHandler;
pub use zip::ZipHandler;
