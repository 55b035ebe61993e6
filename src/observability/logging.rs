//! Best-effort file logging.
//!
//! # Responsibilities
//! - Install the tracing subscriber when `CRSH_LOGFILE` is set
//! - Prefix every line with a local ISO-8601 timestamp at millisecond
//!   precision: `[YYYY-MM-DDTHH:MM:SS.mmm] <message>`
//! - Stay completely silent on any initialization failure
//!
//! Without a configured path no subscriber is installed and every tracing
//! event is a no-op, so the hot path pays nothing for disabled logging.

use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

struct LocalMillis;

impl FormatTime for LocalMillis {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "[{}]", chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"))
    }
}

/// Initialize logging from `CRSH_LOGFILE`.
///
/// Runs before configuration parsing so parse failures are logged too;
/// that ordering is why this reads the variable itself instead of taking
/// the parsed configuration, and nothing else consumes `CRSH_LOGFILE`.
/// A missing variable, an unopenable file or an already-installed
/// subscriber all leave the process running without logging.
pub fn init_from_env() {
    let Some(path) = std::env::var_os("CRSH_LOGFILE") else {
        return;
    };
    if path.is_empty() {
        return;
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(Arc::new(file))
        .with_timer(LocalMillis)
        .with_ansi(false)
        .with_level(false)
        .with_target(false);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();
}
