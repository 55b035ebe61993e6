//! HTTP operation engine.
//!
//! # Responsibilities
//! - Derive object URLs from the configured base, layout and hex key
//! - Issue GET/HEAD/PUT/DELETE against the remote store
//! - Classify HTTP results into {OK, NOOP, ERROR}

pub mod client;
pub mod url;

pub use client::{Outcome, StorageClient, StorageInitError};
