//! Configuration subsystem.
//!
//! # Responsibilities
//! - Define the immutable configuration record
//! - Ingest it once at startup from `CRSH_*` environment variables
//! - Fail fast (before any connection is accepted) on malformed input

pub mod loader;
pub mod schema;

pub use loader::{from_env, ConfigError};
pub use schema::{Config, UrlLayout};
