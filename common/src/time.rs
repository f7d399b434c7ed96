// A simple module to define the time types used in the project
//
// The lottery never reads the system time directly: every operation that
// depends on time receives it from the ledger (`Ledger::current_time`).
// The helpers below are only meant for clocks backing a ledger, logging
// and the daemon loops.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Millis timestamps used to determine it using its type
pub type TimestampMillis = u64;

// Seconds timestamps used to determine it using its type
pub type TimestampSeconds = u64;

#[inline]
pub fn get_current_time() -> Duration {
    // A clock set before 1970 is reported as the epoch itself
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

// Return timestamp in seconds
pub fn get_current_time_in_seconds() -> TimestampSeconds {
    get_current_time().as_secs()
}

// Return timestamp in milliseconds
// We cast it to u64 as we have plenty of time before it overflows (year 584,942,417 AD)
pub fn get_current_time_in_millis() -> TimestampMillis {
    get_current_time().as_millis() as TimestampMillis
}

// Elapsed seconds between two timestamps, zero if `now` is behind `since`
#[inline]
pub fn elapsed_seconds(since: TimestampSeconds, now: TimestampSeconds) -> TimestampSeconds {
    now.saturating_sub(since)
}
