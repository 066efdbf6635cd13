//! I/O helpers shared by the format handlers and the orchestrator.

pub mod copy;
pub mod counting;

pub use copy::CopyBuffer;
pub use copy::copy_with_progress;
pub use counting::CountingWriter;
