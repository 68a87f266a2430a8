//! Timer records and the pure fire-instant arithmetic.
//!
//! A timer may carry a daily time-of-day window `[start_time, end_time]`
//! (`start_time == end_time` means "no window") and an inclusive date range
//! (`NaiveDate::MAX` as end date means "no bound"). The functions here
//! compute first and subsequent fire instants; they are pure so the
//! windowing rules can be tested without clocks or threads.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeDelta, Utc};
use std::sync::Arc;

pub(crate) type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

pub(crate) struct Timer {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: TimeDelta,
    pub end_time: TimeDelta,
    pub duration: TimeDelta,
    /// Remaining firings; `i32::MAX` means infinite.
    pub repeat: i32,
    pub callback: Callback,
}

impl Timer {
    pub fn has_window(&self) -> bool {
        self.start_time != self.end_time
    }

    /// Instant after which the timer is dead, if it has an end date.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        if self.end_date == NaiveDate::MAX {
            return None;
        }
        Some(self.end_date.and_time(NaiveTime::MIN).and_utc() + self.end_time)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.repeat <= 0 || self.expiry().is_some_and(|e| e <= now)
    }
}

pub(crate) fn start_of_day(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// First fire instant for a timer registered at `now`.
///
/// The raw instant is `now + duration`, snapped into the daily window:
/// before the window it shifts to today's `start_time`; past the window it
/// rolls to the next day's `start_time + 1µs`; inside the window it rounds
/// up to the next `start_time + k·duration` grid point. An instant landing
/// before `start_date` shifts to that date's window start.
pub(crate) fn first_fire(now: DateTime<Utc>, timer: &Timer) -> DateTime<Utc> {
    let mut point = now + timer.duration;

    if timer.start_date != NaiveDate::MIN && point.date_naive() < timer.start_date {
        return timer.start_date.and_time(NaiveTime::MIN).and_utc() + timer.start_time;
    }
    if !timer.has_window() {
        return point;
    }

    let day = start_of_day(point);
    let tod = point - day;
    if tod < timer.start_time {
        point = day + timer.start_time;
    } else if tod > timer.end_time {
        point = day + Duration::days(1) + timer.start_time + TimeDelta::microseconds(1);
    } else {
        let gap_us = (tod - timer.start_time).num_microseconds().unwrap_or(0);
        let dur_us = timer.duration.num_microseconds().unwrap_or(i64::MAX).max(1);
        let rem = gap_us % dur_us;
        if rem != 0 {
            let k = gap_us / dur_us + 1;
            point = day + timer.start_time + TimeDelta::microseconds(k * dur_us);
            if point - day > timer.end_time {
                point = day + Duration::days(1) + timer.start_time + TimeDelta::microseconds(1);
            }
        }
    }
    point
}

/// Next fire instant after a firing scheduled at `fired`, or `None` when
/// the timer is past its end date.
///
/// The next instant is `fired + duration`; when a daily window applies and
/// the instant overruns the fired day's `end_time`, it rolls to the next
/// day's `start_time + 1µs`.
pub(crate) fn next_fire(fired: DateTime<Utc>, timer: &Timer) -> Option<DateTime<Utc>> {
    let mut next = fired + timer.duration;

    if let Some(expiry) = timer.expiry() {
        if next > expiry {
            return None;
        }
    }

    if timer.has_window() {
        let day = start_of_day(fired);
        if next > day + timer.end_time {
            next = day + Duration::days(1) + timer.start_time + TimeDelta::microseconds(1);
        }
    }
    Some(next)
}
