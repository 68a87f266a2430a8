//! Condition — system-level validity gate, evaluated after the environment.
//!
//! Unlike the environment (a market-wide query) a condition may consult the
//! ledger and the signal history; both are passed in at call time.

use crate::domain::BarSeries;
use crate::components::{Signal, TradeManager};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub trait Condition: Send {
    fn name(&self) -> &str;

    /// Whether the system itself is in a tradable state at `datetime`.
    fn is_valid(
        &mut self,
        datetime: DateTime<Utc>,
        tm: &dyn TradeManager,
        sg: &mut dyn Signal,
    ) -> bool;

    fn set_series(&mut self, _series: &BarSeries) {}

    fn reset(&mut self) {}

    fn clone_box(&self) -> Box<dyn Condition>;
}

impl Clone for Box<dyn Condition> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Condition that is always satisfied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NullCondition;

impl Condition for NullCondition {
    fn name(&self) -> &str {
        "null_condition"
    }

    fn is_valid(
        &mut self,
        _datetime: DateTime<Utc>,
        _tm: &dyn TradeManager,
        _sg: &mut dyn Signal,
    ) -> bool {
        true
    }

    fn clone_box(&self) -> Box<dyn Condition> {
        Box::new(self.clone())
    }
}
