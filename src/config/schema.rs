//! Configuration schema definitions.
//!
//! This module defines the complete configuration for the helper daemon.
//! The record is populated once at startup by the loader and never mutated
//! afterwards; every other subsystem reads it by shared reference.

use std::path::PathBuf;

/// Root configuration for the storage helper.
#[derive(Debug, Clone)]
pub struct Config {
    /// Platform-native IPC endpoint path. A Unix-domain socket path on
    /// POSIX; on Windows the loader prefixes the configured name with
    /// `\\.\pipe\`.
    pub ipc_endpoint: PathBuf,

    /// Base HTTP(S) URL of the remote object store.
    pub url: String,

    /// Seconds of local-protocol quiescence before self-termination.
    /// `0` disables idle shutdown.
    pub idle_timeout_seconds: u64,

    /// Optional static bearer token, sent as `Authorization: Bearer <token>`
    /// on every outgoing request.
    pub bearer_token: Option<String>,

    /// Mapping from cache key to URL path suffix.
    pub layout: UrlLayout,

    /// Static headers appended verbatim to every HTTP request, in
    /// declaration order.
    pub headers: Vec<(String, String)>,
}

/// URL layout: how a hex key maps onto the path below the base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UrlLayout {
    /// Bazel remote cache action-cache layout: `ac/` + 64 hex digits.
    Bazel,

    /// The key appended verbatim.
    Flat,

    /// Two-character fan-out: `ab/cdef` for key `abcdef`.
    #[default]
    Subdirs,
}
