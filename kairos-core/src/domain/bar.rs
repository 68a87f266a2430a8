//! OHLCV bars and the series binding handed to strategy components.

use crate::domain::Instrument;
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Single OHLCV bar for one instrument at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
}

impl Bar {
    pub fn new(
        datetime: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        amount: f64,
    ) -> Self {
        Self { datetime, open, high, low, close, volume, amount }
    }

    /// Domain validity rule: non-negative prices/volume, `low <= high`,
    /// and open/close inside the bar's range.
    pub fn is_valid(&self) -> bool {
        self.open >= 0.0
            && self.low >= 0.0
            && self.volume >= 0.0
            && self.low <= self.high
            && (self.low..=self.high).contains(&self.open)
            && (self.low..=self.high).contains(&self.close)
    }

    /// A bar the execution gate refuses by default: zero intrabar range, or
    /// a close that escaped the range entirely (corrupt data).
    pub fn is_degenerate(&self) -> bool {
        self.high == self.low || self.close > self.high || self.close < self.low
    }
}

/// An instrument together with its ordered candle series.
///
/// This is the object a [`TradingSystem`](crate::system::TradingSystem) is
/// bound to: one series, one instrument, bars in strictly increasing
/// datetime order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSeries {
    instrument: Instrument,
    bars: Vec<Bar>,
}

impl BarSeries {
    /// Build a series, rejecting empty input and out-of-order datetimes.
    pub fn new(instrument: Instrument, bars: Vec<Bar>) -> Result<Self, CoreError> {
        if bars.is_empty() {
            return Err(CoreError::EmptySeries);
        }
        for i in 1..bars.len() {
            if bars[i].datetime <= bars[i - 1].datetime {
                return Err(CoreError::UnorderedSeries(i));
            }
        }
        Ok(Self { instrument, bars })
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn bar(day: u32, close: f64) -> Bar {
        Bar::new(at(day), close - 0.5, close + 1.0, close - 1.0, close, 1000.0, close * 1000.0)
    }

    #[test]
    fn valid_bar_passes() {
        assert!(bar(1, 100.0).is_valid());
    }

    #[test]
    fn close_outside_range_is_invalid_and_degenerate() {
        let mut b = bar(1, 100.0);
        b.close = b.high + 5.0;
        assert!(!b.is_valid());
        assert!(b.is_degenerate());
    }

    #[test]
    fn limit_locked_bar_is_degenerate() {
        let b = Bar::new(at(1), 100.0, 100.0, 100.0, 100.0, 0.0, 0.0);
        assert!(b.is_degenerate());
    }

    #[test]
    fn normal_bar_is_not_degenerate() {
        assert!(!bar(1, 100.0).is_degenerate());
    }

    #[test]
    fn series_rejects_empty() {
        let r = BarSeries::new(Instrument::equity("TEST"), vec![]);
        assert!(matches!(r, Err(CoreError::EmptySeries)));
    }

    #[test]
    fn series_rejects_unordered() {
        let r = BarSeries::new(Instrument::equity("TEST"), vec![bar(2, 100.0), bar(1, 99.0)]);
        assert!(matches!(r, Err(CoreError::UnorderedSeries(1))));
    }

    #[test]
    fn series_rejects_duplicate_datetime() {
        let r = BarSeries::new(Instrument::equity("TEST"), vec![bar(1, 100.0), bar(1, 101.0)]);
        assert!(matches!(r, Err(CoreError::UnorderedSeries(1))));
    }

    #[test]
    fn series_accepts_ordered_bars() {
        let s = BarSeries::new(Instrument::equity("TEST"), vec![bar(1, 100.0), bar(2, 101.0)])
            .unwrap();
        assert_eq!(s.len(), 2);
    }
}
