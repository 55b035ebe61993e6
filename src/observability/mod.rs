//! Observability: the append-only, best-effort log sink.

pub mod logging;
