//! Process lifecycle: startup ordering and coordinated shutdown.

pub mod shutdown;

pub use shutdown::Shutdown;
