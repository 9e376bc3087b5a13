//! Public key derivation
//!
//! Keys look like `{millis}.{extension}`. The millisecond part is strictly
//! increasing within a process, so two uploads in the same millisecond get
//! distinct keys; cross-process collisions are caught by the primary key
//! and retried by the ingest pipeline.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;

/// Source of the ingest timestamp
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::Relaxed);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::Relaxed)
    }
}

/// Hands out strictly increasing millisecond timestamps
pub struct KeyGenerator {
    clock: Arc<dyn Clock>,
    last: AtomicI64,
}

impl KeyGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last: AtomicI64::new(0),
        }
    }

    /// `max(now, last + 1)`
    pub fn next_timestamp(&self) -> i64 {
        let now = self.clock.now_millis();
        let mut last = self.last.load(Ordering::Acquire);
        loop {
            let candidate = now.max(last + 1);
            match self.last.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

pub fn compose_key(timestamp_millis: i64, extension: &str) -> String {
    format!("{}.{}", timestamp_millis, extension)
}
