//! Slippage — plan price to fill price.
//!
//! Directional: buyers pay more, sellers receive less.

use crate::domain::BarSeries;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub trait Slippage: Send {
    fn name(&self) -> &str;

    fn real_buy_price(&mut self, datetime: DateTime<Utc>, plan_price: f64) -> f64;

    fn real_sell_price(&mut self, datetime: DateTime<Utc>, plan_price: f64) -> f64;

    fn set_series(&mut self, _series: &BarSeries) {}

    fn reset(&mut self) {}

    fn clone_box(&self) -> Box<dyn Slippage>;
}

impl Clone for Box<dyn Slippage> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Fills at the plan price exactly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoSlippage;

impl Slippage for NoSlippage {
    fn name(&self) -> &str {
        "no_slippage"
    }

    fn real_buy_price(&mut self, _datetime: DateTime<Utc>, plan_price: f64) -> f64 {
        plan_price
    }

    fn real_sell_price(&mut self, _datetime: DateTime<Utc>, plan_price: f64) -> f64 {
        plan_price
    }

    fn clone_box(&self) -> Box<dyn Slippage> {
        Box::new(self.clone())
    }
}

/// Fixed basis-point slippage, applied adversely on both sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BpsSlippage {
    pub bps: f64,
}

impl BpsSlippage {
    pub fn new(bps: f64) -> Self {
        assert!(bps >= 0.0, "bps must be non-negative");
        Self { bps }
    }

    fn fraction(&self) -> f64 {
        self.bps / 10_000.0
    }
}

impl Slippage for BpsSlippage {
    fn name(&self) -> &str {
        "bps_slippage"
    }

    fn real_buy_price(&mut self, _datetime: DateTime<Utc>, plan_price: f64) -> f64 {
        plan_price * (1.0 + self.fraction())
    }

    fn real_sell_price(&mut self, _datetime: DateTime<Utc>, plan_price: f64) -> f64 {
        plan_price * (1.0 - self.fraction())
    }

    fn clone_box(&self) -> Box<dyn Slippage> {
        Box::new(self.clone())
    }
}
