//! Catches up on refreshes missed while the page was hidden.
//!
//! Background tabs and embedded frames get their timers throttled, so the page
//! reports visibility and focus changes. A report that lands just after a
//! quarter-hour mark, long enough after the previous refresh, earns an
//! out-of-band refresh.

use crate::schedule::just_after_mark;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::time::Duration;

/// How long after a mark a visibility report still counts as "at the mark".
pub const MARK_WINDOW: Duration = Duration::from_secs(5);

/// Minimum age of the previous refresh before a catch-up is allowed.
pub const MIN_ELAPSED: Duration = Duration::from_secs(14 * 60);

pub fn should_refresh(
    now: DateTime<Utc>,
    timezone: Tz,
    last_refresh: Option<DateTime<Utc>>,
) -> bool {
    if !just_after_mark(&now.with_timezone(&timezone), MARK_WINDOW) {
        return false;
    }
    match last_refresh {
        None => true,
        Some(last) => (now - last)
            .to_std()
            .is_ok_and(|elapsed| elapsed >= MIN_ELAPSED),
    }
}
