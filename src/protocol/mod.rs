//! The compact binary protocol spoken with the compiler-cache front-end.
//!
//! # Responsibilities
//! - Define the request/response wire format constants
//! - Parse length-prefixed request frames incrementally
//! - Encode greeting and response frames

pub mod frame;

pub use frame::{Parsed, Request};
