//! Shutdown coordination.
//!
//! A STOP request, an idle-timer expiry and an unrecoverable framing error
//! all end the daemon through the same path: trigger the signal, let the
//! accept loop fall out, remove the endpoint. Outstanding storage operations
//! are simply dropped with the runtime; their completions never fire.

use tokio::sync::broadcast;

/// Coordinator for clean shutdown.
///
/// Wraps a broadcast channel so any task can trigger termination and the
/// accept loop can wait for it. Cloning shares the same signal.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger shutdown. Safe to call more than once; later calls are
    /// no-ops as far as subscribers are concerned.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
