//! Current/upcoming class resolution for unattended terminals.
//!
//! Both checks work off one `NaiveDateTime` produced from a single
//! `Local::now()` read, so the calendar-date test and the time-of-day test
//! can never disagree around midnight.

use chrono::{Duration, NaiveDateTime};

use crate::store::Class;

pub const DEFAULT_LOOKAHEAD_MINUTES: i64 = 60;

/// The class whose window contains `now`, among classes already filtered to
/// `now`'s calendar date. Overlapping windows resolve to the earliest start.
pub fn current_class(classes: &[Class], now: NaiveDateTime) -> Option<&Class> {
    let t = now.time();
    classes
        .iter()
        .filter(|c| c.date == now.date() && c.start_time <= t && t <= c.end_time)
        .min_by_key(|c| c.start_time)
}

/// The earliest class today starting strictly after `now`, no further out
/// than `lookahead_minutes`.
pub fn upcoming_class(
    classes: &[Class],
    now: NaiveDateTime,
    lookahead_minutes: i64,
) -> Option<&Class> {
    let t = now.time();
    let horizon = now
        .checked_add_signed(Duration::minutes(lookahead_minutes))
        .unwrap_or(now);
    classes
        .iter()
        .filter(|c| {
            if c.date != now.date() || c.start_time <= t {
                return false;
            }
            // A horizon past midnight covers the remainder of today.
            horizon.date() != now.date() || c.start_time <= horizon.time()
        })
        .min_by_key(|c| c.start_time)
}
