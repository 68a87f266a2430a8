//! Open position bookkeeping record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An open holding in one instrument. `number == 0` means flat; the
/// `TradeManager` trait expresses flatness as `None` instead of handing out
/// zero-quantity records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub symbol: String,
    /// Datetime of the first entry that opened this position.
    pub take_datetime: DateTime<Utc>,
    pub number: f64,
    /// Cost basis: cash spent acquiring the current holding (including costs).
    pub buy_money: f64,
    pub stoploss: f64,
    pub goal_price: f64,
    /// Risk accepted at entry, accumulated over adds:
    /// `(entry price - stoploss) * number` per fill.
    pub total_risk: f64,
}

impl PositionRecord {
    pub fn open(
        symbol: impl Into<String>,
        take_datetime: DateTime<Utc>,
        number: f64,
        buy_money: f64,
        stoploss: f64,
        goal_price: f64,
        total_risk: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            take_datetime,
            number,
            buy_money,
            stoploss,
            goal_price,
            total_risk,
        }
    }

    /// Average entry cost per unit.
    pub fn avg_cost(&self) -> f64 {
        if self.number > 0.0 {
            self.buy_money / self.number
        } else {
            0.0
        }
    }
}
