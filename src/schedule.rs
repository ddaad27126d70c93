use chrono::{DateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::time::Duration;

/// Refreshes land on :00, :15, :30 and :45.
pub const MARK_MINUTES: u32 = 15;

const MARK_MILLIS: u64 = MARK_MINUTES as u64 * 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    WallClock { timezone: Tz },
    FixedInterval(Duration),
}

impl RefreshPolicy {
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        match self {
            Self::WallClock { timezone } => until_next_mark(&now.with_timezone(timezone)),
            Self::FixedInterval(interval) => *interval,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::WallClock { .. } => "wall_clock",
            Self::FixedInterval(_) => "fixed_interval",
        }
    }
}

/// Time until the next quarter-hour mark strictly after `now`, on its local
/// clock. Sitting on a mark, or just past one, targets the following mark.
pub fn until_next_mark<T: TimeZone>(now: &DateTime<T>) -> Duration {
    Duration::from_millis(MARK_MILLIS - millis_past_mark(now))
}

/// True when `now` sits less than `window` past a quarter-hour mark.
pub fn just_after_mark<T: TimeZone>(now: &DateTime<T>, window: Duration) -> bool {
    millis_past_mark(now) < window.as_millis() as u64
}

fn millis_past_mark<T: TimeZone>(now: &DateTime<T>) -> u64 {
    u64::from(now.minute() % MARK_MINUTES) * 60_000
        + u64::from(now.second().min(59)) * 1_000
        + u64::from(now.timestamp_subsec_millis().min(999))
}
