use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, Utc};

const DISPLAY_FORMAT: &str = "%H:%M:%S";

/// Time source for liveness checks and message timestamps.
pub trait Clock: Send + Sync {
    /// Epoch milliseconds.
    fn now_millis(&self) -> i64;

    /// Wall-clock time shown on messages. Computed per call, never cached.
    fn display_time(&self) -> String;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn display_time(&self) -> String {
        Local::now().format(DISPLAY_FORMAT).to_string()
    }
}

/// Clock that only moves when told to.
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }

    fn display_time(&self) -> String {
        DateTime::<Utc>::from_timestamp_millis(self.now_millis())
            .map(|t| t.format(DISPLAY_FORMAT).to_string())
            .unwrap_or_default()
    }
}
