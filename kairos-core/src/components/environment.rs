//! Environment — a pure query over external market state.
//!
//! "Is the broad market in a condition where this system is allowed to hold
//! a position at all?" The system reacts to validity *transitions*: a
//! true→false edge flushes any long position, a false→true edge may open
//! one when `ev_open_position` is set.

use crate::domain::BarSeries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub trait Environment: Send {
    fn name(&self) -> &str;

    /// Whether the environment permits holding at `datetime`.
    fn is_valid(&mut self, datetime: DateTime<Utc>) -> bool;

    /// Bind to the candle series the system runs over.
    fn set_series(&mut self, _series: &BarSeries) {}

    /// Return to pristine state.
    fn reset(&mut self) {}

    fn clone_box(&self) -> Box<dyn Environment>;
}

impl Clone for Box<dyn Environment> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Environment that is always valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NullEnvironment;

impl Environment for NullEnvironment {
    fn name(&self) -> &str {
        "null_environment"
    }

    fn is_valid(&mut self, _datetime: DateTime<Utc>) -> bool {
        true
    }

    fn clone_box(&self) -> Box<dyn Environment> {
        Box::new(self.clone())
    }
}

/// Valid inside a half-open datetime range, invalid outside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRangeEnvironment {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRangeEnvironment {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(end > start, "end must be after start");
        Self { start, end }
    }
}

impl Environment for DateRangeEnvironment {
    fn name(&self) -> &str {
        "date_range_environment"
    }

    fn is_valid(&mut self, datetime: DateTime<Utc>) -> bool {
        datetime >= self.start && datetime < self.end
    }

    fn clone_box(&self) -> Box<dyn Environment> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn null_environment_always_valid() {
        let mut ev = NullEnvironment;
        assert!(ev.is_valid(at(1)));
        assert!(ev.is_valid(at(30)));
    }

    #[test]
    fn range_environment_is_half_open() {
        let mut ev = DateRangeEnvironment::new(at(5), at(10));
        assert!(!ev.is_valid(at(4)));
        assert!(ev.is_valid(at(5)));
        assert!(ev.is_valid(at(9)));
        assert!(!ev.is_valid(at(10)));
    }
}
