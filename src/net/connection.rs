//! Per-connection protocol state machine.
//!
//! # Responsibilities
//! - Push the greeting frame before anything else
//! - Accumulate raw bytes and carve complete request frames out of them
//! - Dispatch requests to the storage client and frame the outcomes
//! - Keep writes strictly serialized and in completion order
//!
//! Requests on one connection are handled to completion in arrival order,
//! one at a time; concurrency lives across connections, which all share the
//! storage client's transfer pool. Each response chunk is awaited before the
//! next starts, so at most one write is ever outstanding and a GET's header
//! and body chunks can never be interleaved with another frame.

use std::io;
use std::rc::Rc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::lifecycle::{IdleTimer, Shutdown};
use crate::protocol::frame::{self, parse_request};
use crate::protocol::{Parsed, Request};
use crate::storage::{Outcome, StorageClient};

enum Next {
    Continue,
    Close,
}

/// How a connection ended: the peer went away (or its stream failed), or
/// the daemon itself is shutting down (STOP, framing error).
enum Ending {
    Disconnect,
    Shutdown,
}

/// One accepted client connection.
pub struct Connection<S> {
    stream: S,
    read_buf: Vec<u8>,
    storage: Rc<StorageClient>,
    shutdown: Shutdown,
    idle: IdleTimer,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, storage: Rc<StorageClient>, shutdown: Shutdown, idle: IdleTimer) -> Self {
        Self {
            stream,
            read_buf: Vec::new(),
            storage,
            shutdown,
            idle,
        }
    }

    /// Drive the connection until the peer goes away, a write fails, or a
    /// STOP / framing error ends the daemon.
    pub async fn run(mut self) {
        tracing::info!("Client connected");

        // Every close that isn't part of daemon shutdown gets the same
        // disconnect line, whether the peer hung up cleanly or its stream
        // failed mid-request.
        if let Ending::Disconnect = self.serve().await {
            tracing::info!("Client disconnected");
        }
    }

    async fn serve(&mut self) -> Ending {
        if let Err(e) = self.send(&frame::greeting()).await {
            tracing::warn!("Failed to send greeting: {e}");
            return Ending::Disconnect;
        }

        loop {
            match parse_request(&self.read_buf) {
                Parsed::Frame(request, consumed) => {
                    self.read_buf.drain(..consumed);
                    self.idle.touch();
                    match self.dispatch(request).await {
                        Ok(Next::Continue) => {}
                        // STOP: shutdown is already triggered.
                        Ok(Next::Close) => return Ending::Shutdown,
                        Err(e) => {
                            tracing::warn!("Write failed: {e}");
                            return Ending::Disconnect;
                        }
                    }
                }
                Parsed::Incomplete => match self.stream.read_buf(&mut self.read_buf).await {
                    Ok(0) => return Ending::Disconnect,
                    Ok(_) => self.idle.touch(),
                    Err(e) => {
                        tracing::warn!("Read error: {e}");
                        return Ending::Disconnect;
                    }
                },
                Parsed::Unknown(request_type) => {
                    tracing::warn!("Unknown request type: {request_type}");
                    self.shutdown.trigger();
                    return Ending::Shutdown;
                }
            }
        }
    }

    async fn dispatch(&mut self, request: Request) -> io::Result<Next> {
        match request {
            Request::Stop => {
                tracing::info!("STOP request received");
                // The final OK goes out (and is flushed) before the accept
                // loop tears everything down; shutdown is triggered even if
                // the write fails.
                let sent = self.send(&frame::ok()).await;
                let flushed = self.stream.flush().await;
                self.shutdown.trigger();
                sent?;
                flushed?;
                Ok(Next::Close)
            }
            Request::Get { key } => {
                let hex_key = hex::encode(&key);
                tracing::info!("GET request for key {hex_key}");
                match self.storage.get(&hex_key).await {
                    Outcome::Ok(data) => {
                        // Header and body are two chunks, written back to
                        // back with nothing in between.
                        self.send(&frame::value_header(data.len() as u64)).await?;
                        self.send(&data).await?;
                    }
                    other => self.send_simple("GET", other).await?,
                }
                Ok(Next::Continue)
            }
            Request::Put { key, value, overwrite } => {
                let hex_key = hex::encode(&key);
                tracing::info!("PUT request for key {hex_key} ({} bytes)", value.len());
                let outcome = self.storage.put(&hex_key, value, overwrite).await;
                self.send_simple("PUT", outcome).await?;
                Ok(Next::Continue)
            }
            Request::Remove { key } => {
                let hex_key = hex::encode(&key);
                tracing::info!("REMOVE request for key {hex_key}");
                let outcome = self.storage.remove(&hex_key).await;
                self.send_simple("REMOVE", outcome).await?;
                Ok(Next::Continue)
            }
        }
    }

    /// Frame an outcome that carries no payload.
    async fn send_simple(&mut self, operation: &str, outcome: Outcome) -> io::Result<()> {
        let response = match outcome {
            Outcome::Ok(_) => frame::ok(),
            Outcome::Noop => frame::noop(),
            Outcome::Err(message) => {
                tracing::warn!("{operation} failed: {message}");
                frame::error(&message)
            }
        };
        self.send(&response).await
    }

    async fn send(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.stream.write_all(chunk).await
    }
}
