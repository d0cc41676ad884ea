//! Wall-clock abstraction.
//!
//! The creation path and the scheduler sweep both read time through a
//! [`Clock`] so they agree on the representation, and tests can move time
//! forward without sleeping.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::LocalTimestamp;

pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> LocalTimestamp;
}

/// The server's local clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> LocalTimestamp {
        chrono::Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<LocalTimestamp>>,
}

impl ManualClock {
    pub fn new(start: LocalTimestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, at: LocalTimestamp) {
        *self.now.lock() = at;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> LocalTimestamp {
        *self.now.lock()
    }
}
