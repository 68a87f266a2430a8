//! Crate-level error type.
//!
//! Configuration problems (missing components, bad parameter keys) surface
//! to the caller and abort the operation. Domain rejections (refused trades,
//! zero-rounded quantities) are not errors — they are swallowed by the bar
//! loop and expressed as the absence of a trade.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("required component not set: {0}")]
    MissingComponent(&'static str),

    #[error("unknown parameter key: {0}")]
    UnknownParam(String),

    #[error("parameter {key} expects a {expected} value")]
    ParamType { key: String, expected: &'static str },

    #[error("bar series is empty")]
    EmptySeries,

    #[error("bar datetimes must be strictly increasing (violation at index {0})")]
    UnorderedSeries(usize),
}
