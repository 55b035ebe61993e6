//! Local framed protocol server.
//!
//! # Responsibilities
//! - Own the listening endpoint and the accept loop
//! - Spawn one task per connection on the single-threaded runtime
//! - Observe idle expiry and the shutdown signal

pub mod connection;
pub mod listener;

use std::rc::Rc;

use crate::config::Config;
use crate::lifecycle::{IdleTimer, Shutdown};
use crate::net::connection::Connection;
use crate::net::listener::{IpcListener, ListenerError};
use crate::storage::StorageClient;

/// The protocol server: endpoint, idle timer and shutdown signal.
pub struct IpcServer {
    listener: IpcListener,
    storage: Rc<StorageClient>,
    shutdown: Shutdown,
    idle: IdleTimer,
}

impl IpcServer {
    /// Bind the endpoint. Fatal on failure; the caller exits non-zero.
    pub fn bind(config: &Config, storage: Rc<StorageClient>) -> Result<Self, ListenerError> {
        let listener = IpcListener::bind(&config.ipc_endpoint)?;
        Ok(Self {
            listener,
            storage,
            shutdown: Shutdown::new(),
            idle: IdleTimer::new(config.idle_timeout_seconds),
        })
    }

    /// Accept connections until a STOP request, a framing error or idle
    /// expiry ends the daemon, then remove the endpoint.
    ///
    /// Must run inside a `LocalSet`: connection tasks are spawned locally
    /// and share single-threaded state.
    pub async fn run(mut self) {
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(stream) => {
                        self.idle.touch();
                        let connection = Connection::new(
                            stream,
                            Rc::clone(&self.storage),
                            self.shutdown.clone(),
                            self.idle.clone(),
                        );
                        tokio::task::spawn_local(connection.run());
                    }
                    // Per-connection accept failures are not fatal.
                    Err(e) => tracing::warn!("{e}"),
                },
                _ = self.idle.expired() => {
                    tracing::info!("Idle timeout reached, shutting down");
                    break;
                }
                _ = shutdown_rx.recv() => break,
            }
        }

        tracing::info!("Shutting down");
        self.listener.remove_endpoint();
        // Dropping the runtime tears down connection tasks and any HTTP
        // transfers still in flight; their completions are never delivered.
    }
}
