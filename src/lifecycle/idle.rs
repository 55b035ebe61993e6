//! Idle shutdown timer.
//!
//! One sliding deadline for the whole daemon. Local protocol activity
//! (a connection accepted, bytes read, a request dispatched) pushes the
//! deadline out; remote HTTP completions deliberately do not. When the
//! deadline passes, the daemon shuts itself down.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tokio::time::Instant;

/// Sliding idle deadline. Clones share the same deadline cell; the timer is
/// only ever touched from the single event-loop thread.
#[derive(Clone)]
pub struct IdleTimer {
    timeout: Option<Duration>,
    deadline: Rc<Cell<Instant>>,
}

impl IdleTimer {
    /// Create the timer. A zero timeout disables it entirely.
    pub fn new(timeout_seconds: u64) -> Self {
        let timeout = (timeout_seconds > 0).then(|| Duration::from_secs(timeout_seconds));
        let deadline = Instant::now() + timeout.unwrap_or(Duration::ZERO);
        Self {
            timeout,
            deadline: Rc::new(Cell::new(deadline)),
        }
    }

    /// Record activity: re-arm the deadline a full interval out.
    pub fn touch(&self) {
        if let Some(timeout) = self.timeout {
            self.deadline.set(Instant::now() + timeout);
        }
    }

    /// Resolve once the idle interval has fully elapsed. Pends forever when
    /// the timer is disabled.
    ///
    /// The deadline only ever moves forward, so sleeping to the currently
    /// recorded deadline and re-checking is enough: a touch during the sleep
    /// just means another round.
    pub async fn expired(&self) {
        if self.timeout.is_none() {
            return std::future::pending().await;
        }
        loop {
            let deadline = self.deadline.get();
            tokio::time::sleep_until(deadline).await;
            if self.deadline.get() <= Instant::now() {
                return;
            }
        }
    }
}
