// Clock abstraction
//
// The node reads time through this trait so that tests can move time
// forward explicitly instead of sleeping.

use std::sync::atomic::{AtomicU64, Ordering};

use lottery_common::time::{get_current_time_in_seconds, TimestampSeconds};

pub trait Clock: Send + Sync {
    /// Current unix time in seconds
    fn now(&self) -> TimestampSeconds;
}

/// Wall-clock time
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> TimestampSeconds {
        get_current_time_in_seconds()
    }
}

/// Clock that only moves when told to.
///
/// ```
/// use lottery_daemon::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new(1_000);
/// clock.advance(31);
/// assert_eq!(clock.now(), 1_031);
/// ```
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: TimestampSeconds) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, seconds: TimestampSeconds) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    pub fn set(&self, now: TimestampSeconds) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimestampSeconds {
        self.now.load(Ordering::SeqCst)
    }
}
