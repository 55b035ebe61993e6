//! Process lifecycle: idle self-termination and shutdown coordination.

pub mod idle;
pub mod shutdown;

pub use idle::IdleTimer;
pub use shutdown::Shutdown;
