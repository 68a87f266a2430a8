//! Stoploss / take-profit price source.
//!
//! The two concerns share one contract: given a datetime and a reference
//! price, produce a protective level. A returned 0 means "no such bound".
//! The system holds two instances — one wired as the stoploss, one as the
//! trailing take-profit.

use crate::domain::BarSeries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub trait Stoploss: Send {
    fn name(&self) -> &str;

    /// Protective price level for `datetime` given the reference `price`.
    /// 0 means none.
    fn price(&mut self, datetime: DateTime<Utc>, price: f64) -> f64;

    fn set_series(&mut self, _series: &BarSeries) {}

    fn reset(&mut self) {}

    fn clone_box(&self) -> Box<dyn Stoploss>;
}

impl Clone for Box<dyn Stoploss> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// No protective level.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoStop;

impl Stoploss for NoStop {
    fn name(&self) -> &str {
        "no_stop"
    }

    fn price(&mut self, _datetime: DateTime<Utc>, _price: f64) -> f64 {
        0.0
    }

    fn clone_box(&self) -> Box<dyn Stoploss> {
        Box::new(self.clone())
    }
}

/// Fixed percentage below the reference price (above it for the short side,
/// where the caller passes `pct` negated).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedPercentStop {
    /// Stop distance as a fraction, e.g. 0.05 for 5%.
    pub pct: f64,
}

impl FixedPercentStop {
    pub fn new(pct: f64) -> Self {
        assert!(pct > -1.0 && pct < 1.0 && pct != 0.0, "pct must be in (-1, 1) and non-zero");
        Self { pct }
    }
}

impl Stoploss for FixedPercentStop {
    fn name(&self) -> &str {
        "fixed_percent_stop"
    }

    fn price(&mut self, _datetime: DateTime<Utc>, price: f64) -> f64 {
        price * (1.0 - self.pct)
    }

    fn clone_box(&self) -> Box<dyn Stoploss> {
        Box::new(self.clone())
    }
}

/// Explicit per-datetime levels; datetimes not listed yield 0 ("none").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptedStop {
    levels: BTreeMap<DateTime<Utc>, f64>,
}

impl ScriptedStop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level_at(mut self, datetime: DateTime<Utc>, level: f64) -> Self {
        self.levels.insert(datetime, level);
        self
    }
}

impl Stoploss for ScriptedStop {
    fn name(&self) -> &str {
        "scripted_stop"
    }

    fn price(&mut self, datetime: DateTime<Utc>, _price: f64) -> f64 {
        self.levels.get(&datetime).copied().unwrap_or(0.0)
    }

    fn clone_box(&self) -> Box<dyn Stoploss> {
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
    fn fixed_percent_stop_below_price() {
        let mut st = FixedPercentStop::new(0.05);
        assert!((st.price(at(1), 100.0) - 95.0).abs() < 1e-12);
    }

    #[test]
    fn negative_pct_places_level_above_price() {
        // Short-side usage: level above the reference.
        let mut st = FixedPercentStop::new(-0.05);
        assert!((st.price(at(1), 100.0) - 105.0).abs() < 1e-12);
    }

    #[test]
    fn no_stop_returns_zero() {
        let mut st = NoStop;
        assert_eq!(st.price(at(1), 100.0), 0.0);
    }

    #[test]
    fn scripted_stop_defaults_to_none() {
        let mut st = ScriptedStop::new().level_at(at(3), 97.0);
        assert_eq!(st.price(at(3), 100.0), 97.0);
        assert_eq!(st.price(at(4), 100.0), 0.0);
    }
}
