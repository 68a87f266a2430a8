//! Scheduler error type. All variants are submission-time failures; once a
//! timer is accepted, later problems (expiry, cancellation) are silent.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedError {
    #[error("end_date ({end}) must be after start_date ({start})")]
    BadDateRange { start: NaiveDate, end: NaiveDate },

    #[error("time of day must lie in (0, 24h), got {0}")]
    BadTimeOfDay(String),

    #[error("end_time must be >= start_time")]
    BadTimeWindow,

    #[error("repeat_num must be >= 1")]
    BadRepeat,

    #[error("duration must be positive")]
    BadDuration,

    #[error("timer id space exhausted")]
    Exhausted,
}
