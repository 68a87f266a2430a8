//! Instrument metadata: lot bounds, tick size, contract multiplier.

use serde::{Deserialize, Serialize};

/// Trading metadata for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    /// Smallest tradable quantity; also the lot size quantities are rounded to.
    pub min_trade_number: f64,
    /// Largest quantity accepted in a single order.
    pub max_trade_number: f64,
    pub tick_size: f64,
    /// Contract multiplier (1 for cash equities).
    pub multiplier: f64,
}

impl Instrument {
    pub fn new(
        symbol: impl Into<String>,
        min_trade_number: f64,
        max_trade_number: f64,
        tick_size: f64,
        multiplier: f64,
    ) -> Self {
        assert!(min_trade_number > 0.0, "min_trade_number must be > 0");
        assert!(max_trade_number >= min_trade_number, "max_trade_number must be >= min");
        Self {
            symbol: symbol.into(),
            min_trade_number,
            max_trade_number,
            tick_size,
            multiplier,
        }
    }

    /// Plain equity: 1-share lots, penny ticks.
    pub fn equity(symbol: impl Into<String>) -> Self {
        Self::new(symbol, 1.0, 1_000_000.0, 0.01, 1.0)
    }

    /// Board-lot equity (e.g. 100-share lots).
    pub fn board_lot_equity(symbol: impl Into<String>, lot: f64) -> Self {
        Self::new(symbol, lot, 1_000_000.0, 0.01, 1.0)
    }

    /// Round a quantity down to a lot multiple and clamp to the tradable
    /// range. Anything below one lot rounds to zero, meaning "no trade".
    pub fn round_lot(&self, number: f64) -> f64 {
        if number < self.min_trade_number {
            return 0.0;
        }
        let number = number.min(self.max_trade_number);
        if self.min_trade_number > 1.0 {
            (number / self.min_trade_number).floor() * self.min_trade_number
        } else {
            number.floor()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_lot_floors_to_lot_multiple() {
        let inst = Instrument::board_lot_equity("TEST", 100.0);
        assert_eq!(inst.round_lot(250.0), 200.0);
        assert_eq!(inst.round_lot(100.0), 100.0);
    }

    #[test]
    fn round_lot_below_min_is_zero() {
        let inst = Instrument::board_lot_equity("TEST", 100.0);
        assert_eq!(inst.round_lot(99.0), 0.0);
        assert_eq!(inst.round_lot(0.0), 0.0);
    }

    #[test]
    fn round_lot_clamps_to_max() {
        let inst = Instrument::new("TEST", 100.0, 10_000.0, 0.01, 1.0);
        assert_eq!(inst.round_lot(25_000.0), 10_000.0);
    }

    #[test]
    fn unit_lot_floors_fractional_shares() {
        let inst = Instrument::equity("TEST");
        assert_eq!(inst.round_lot(10.7), 10.0);
    }

    #[test]
    #[should_panic(expected = "min_trade_number")]
    fn zero_lot_size_rejected() {
        Instrument::new("TEST", 0.0, 100.0, 0.01, 1.0);
    }
}
