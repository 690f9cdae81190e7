//! Wait computation after the API rejects a listing for exhausted quota.
//!
//! GitHub reports the quota reset as a unix timestamp in `x-ratelimit-reset`.
//! We wait until one second past the reset, but never less than the regular
//! poll interval. Without a usable reset value the poll interval is used.

use std::time::Duration;

/// Wait before retrying a rate-limited round, relative to `now` (unix seconds).
pub fn rate_limit_wait(interval: Duration, reset: Option<&str>, now: i64) -> Duration {
    let Some(reset) = reset.and_then(|r| r.trim().parse::<i64>().ok()) else {
        return interval;
    };

    let until_reset = reset.saturating_sub(now).saturating_add(1);
    let until_reset = Duration::from_secs(u64::try_from(until_reset).unwrap_or(0));

    interval.max(until_reset)
}

/// [`rate_limit_wait`] against the current wall clock.
pub fn rate_limit_wait_now(interval: Duration, reset: Option<&str>) -> Duration {
    rate_limit_wait(interval, reset, chrono::Utc::now().timestamp())
}
