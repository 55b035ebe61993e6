//! Compiler-cache HTTP(S) remote storage helper.
//!
//! A long-running daemon that mediates between a compiler-cache front-end
//! and a remote HTTP(S) object store. The front-end speaks a compact binary
//! protocol over a local stream (Unix-domain socket, or named pipe on
//! Windows); each request becomes an HTTP operation against the store.
//!
//! ```text
//!  front-end ──IPC──▶ net (listener + connections)
//!                         │ parsed requests          lifecycle (idle timer,
//!                         ▼                           shutdown signal)
//!                     protocol (framing)
//!                         │
//!                         ▼
//!                     storage (URL layout, conditional PUT,
//!                         │   status classification)
//!                         ▼
//!                     remote HTTP(S) object store
//! ```
//!
//! Everything runs on one current-thread Tokio runtime: connections, HTTP
//! transfers and the idle timer are cooperatively scheduled tasks sharing
//! state through `Rc`, never across threads.

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod storage;

use std::rc::Rc;

pub use config::Config;

/// Run the daemon to completion.
///
/// Builds the storage client, binds the IPC endpoint and serves until a
/// STOP request, idle expiry or framing error shuts it down. Construction
/// failures are fatal; the caller maps them to a non-zero exit. Must be
/// driven from within a `tokio::task::LocalSet` on a current-thread
/// runtime.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let storage = Rc::new(storage::StorageClient::new(&config)?);
    let server = net::IpcServer::bind(&config, storage)?;
    server.run().await;
    Ok(())
}
