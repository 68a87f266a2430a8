//! Trade records and their provenance tags.

use crate::domain::CostRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Business kind of an executed trade.
///
/// A refused trade is represented as `Option::None` at the
/// `TradeManager` boundary, not as a sentinel variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Business {
    /// Ledger opening record.
    Init,
    Buy,
    Sell,
    /// Open a short position (borrowed stock sold).
    SellShort,
    /// Buy to cover a short position.
    BuyShort,
}

/// Which subsystem originated a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOrigin {
    Signal,
    Stoploss,
    TakeProfit,
    ProfitGoal,
    Environment,
    Condition,
    Portfolio,
    AllocateFunds,
    Other,
}

/// One executed trade, appended to the system's trade list in execution
/// order. `datetime` is the bar on which the trade executed, which may be
/// later than the bar on which it was decided (delayed orders).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub datetime: DateTime<Utc>,
    pub symbol: String,
    pub business: Business,
    /// Quantity traded, already lot-rounded.
    pub number: f64,
    pub cost: CostRecord,
    /// The price the decision was planned at (close of the decision bar, or
    /// open of the execution bar for delayed orders).
    pub plan_price: f64,
    pub stoploss: f64,
    pub goal_price: f64,
    /// The price actually paid/received after slippage.
    pub real_price: f64,
    pub origin: TradeOrigin,
    /// Cash remaining after the trade settled.
    pub cash: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn trade_record_serde_roundtrip() {
        let tr = TradeRecord {
            datetime: Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap(),
            symbol: "TEST".into(),
            business: Business::Buy,
            number: 200.0,
            cost: CostRecord::new(1.0, 0.0, 0.1, 0.0),
            plan_price: 100.0,
            stoploss: 95.0,
            goal_price: 120.0,
            real_price: 100.05,
            origin: TradeOrigin::Signal,
            cash: 79_989.0,
        };
        let json = serde_json::to_string(&tr).unwrap();
        let back: TradeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(tr, back);
    }
}
