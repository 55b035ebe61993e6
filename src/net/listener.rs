//! IPC endpoint listener.
//!
//! # Responsibilities
//! - Own the platform-native endpoint (Unix-domain socket / named pipe)
//! - Unlink a stale POSIX socket before bind, and again on shutdown
//! - Bind under a restrictive umask so the socket is owner-only
//! - Accept incoming connections for the protocol server

use std::io;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
#[cfg(windows)]
use tokio::net::windows::named_pipe::{NamedPipeServer, ServerOptions};

/// The accepted stream type handed to the connection state machine.
#[cfg(unix)]
pub type IpcStream = UnixStream;
#[cfg(windows)]
pub type IpcStream = NamedPipeServer;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind the endpoint.
    Bind(io::Error),
    /// Failed to accept a connection.
    Accept(io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "Failed to bind IPC endpoint: {}", e),
            ListenerError::Accept(e) => write!(f, "Failed to accept connection: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// Listener owning the local endpoint.
#[cfg(unix)]
pub struct IpcListener {
    inner: UnixListener,
    path: PathBuf,
}

#[cfg(unix)]
impl IpcListener {
    /// Bind the Unix-domain socket at `path`.
    ///
    /// A stale socket file from a previous run is removed first. The bind
    /// itself runs under umask 0077 so only the owner can connect.
    pub fn bind(path: &Path) -> Result<Self, ListenerError> {
        let _ = std::fs::remove_file(path);

        let old_umask = unsafe { libc::umask(0o077) };
        let bound = UnixListener::bind(path);
        unsafe { libc::umask(old_umask) };

        let inner = bound.map_err(ListenerError::Bind)?;
        tracing::info!("IPC server listening on {}", path.display());
        Ok(Self {
            inner,
            path: path.to_path_buf(),
        })
    }

    /// Accept the next connection.
    pub async fn accept(&mut self) -> Result<IpcStream, ListenerError> {
        let (stream, _addr) = self.inner.accept().await.map_err(ListenerError::Accept)?;
        Ok(stream)
    }

    /// Remove the socket file. Called on shutdown.
    pub fn remove_endpoint(&self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Listener owning the local endpoint.
///
/// Named pipes have no persistent filesystem object: each accepted client
/// consumes one server instance, so a fresh instance is created ahead of
/// every accept.
#[cfg(windows)]
pub struct IpcListener {
    path: PathBuf,
    next: Option<NamedPipeServer>,
}

#[cfg(windows)]
impl IpcListener {
    /// Create the first pipe instance at `path` (already `\\.\pipe\`-prefixed
    /// by the configuration loader).
    pub fn bind(path: &Path) -> Result<Self, ListenerError> {
        let first = ServerOptions::new()
            .first_pipe_instance(true)
            .create(path)
            .map_err(ListenerError::Bind)?;
        tracing::info!("IPC server listening on {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            next: Some(first),
        })
    }

    /// Wait for the next client and hand back its pipe instance.
    pub async fn accept(&mut self) -> Result<IpcStream, ListenerError> {
        let server = match self.next.take() {
            Some(server) => server,
            None => ServerOptions::new()
                .create(&self.path)
                .map_err(ListenerError::Accept)?,
        };
        server.connect().await.map_err(ListenerError::Accept)?;
        self.next = ServerOptions::new().create(&self.path).ok();
        Ok(server)
    }

    /// Nothing to clean up: pipe instances disappear with their handles.
    pub fn remove_endpoint(&self) {}
}
