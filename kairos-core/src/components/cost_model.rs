//! Cost model — commission/tax arithmetic consumed by the trade manager.
//!
//! Borrow/return costs default to zero so cash-only models stay small.

use crate::domain::{CostRecord, Instrument};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub trait CostModel: Send {
    fn name(&self) -> &str;

    fn buy_cost(
        &self,
        datetime: DateTime<Utc>,
        instrument: &Instrument,
        price: f64,
        number: f64,
    ) -> CostRecord;

    fn sell_cost(
        &self,
        datetime: DateTime<Utc>,
        instrument: &Instrument,
        price: f64,
        number: f64,
    ) -> CostRecord;

    fn borrow_cash_cost(&self, _datetime: DateTime<Utc>, _cash: f64) -> CostRecord {
        CostRecord::zero()
    }

    fn return_cash_cost(
        &self,
        _borrow_datetime: DateTime<Utc>,
        _return_datetime: DateTime<Utc>,
        _cash: f64,
    ) -> CostRecord {
        CostRecord::zero()
    }

    fn borrow_stock_cost(
        &self,
        _datetime: DateTime<Utc>,
        _instrument: &Instrument,
        _price: f64,
        _number: f64,
    ) -> CostRecord {
        CostRecord::zero()
    }

    fn return_stock_cost(
        &self,
        _borrow_datetime: DateTime<Utc>,
        _return_datetime: DateTime<Utc>,
        _instrument: &Instrument,
        _price: f64,
        _number: f64,
    ) -> CostRecord {
        CostRecord::zero()
    }

    fn clone_box(&self) -> Box<dyn CostModel>;
}

impl Clone for Box<dyn CostModel> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Frictionless trading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZeroCost;

impl CostModel for ZeroCost {
    fn name(&self) -> &str {
        "zero_cost"
    }

    fn buy_cost(
        &self,
        _datetime: DateTime<Utc>,
        _instrument: &Instrument,
        _price: f64,
        _number: f64,
    ) -> CostRecord {
        CostRecord::zero()
    }

    fn sell_cost(
        &self,
        _datetime: DateTime<Utc>,
        _instrument: &Instrument,
        _price: f64,
        _number: f64,
    ) -> CostRecord {
        CostRecord::zero()
    }

    fn clone_box(&self) -> Box<dyn CostModel> {
        Box::new(self.clone())
    }
}

/// Basis-point commission with a minimum, plus sell-side stamp tax and a
/// flat per-trade transfer fee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BpsCost {
    pub commission_bps: f64,
    pub min_commission: f64,
    /// Stamp tax in basis points, charged on sells only.
    pub stamp_tax_bps: f64,
    pub transfer_fee: f64,
}

impl BpsCost {
    pub fn new(commission_bps: f64, min_commission: f64, stamp_tax_bps: f64, transfer_fee: f64) -> Self {
        Self { commission_bps, min_commission, stamp_tax_bps, transfer_fee }
    }

    fn commission(&self, notional: f64) -> f64 {
        (notional * self.commission_bps / 10_000.0).max(self.min_commission)
    }
}

impl CostModel for BpsCost {
    fn name(&self) -> &str {
        "bps_cost"
    }

    fn buy_cost(
        &self,
        _datetime: DateTime<Utc>,
        instrument: &Instrument,
        price: f64,
        number: f64,
    ) -> CostRecord {
        let notional = price * number * instrument.multiplier;
        CostRecord::new(self.commission(notional), 0.0, self.transfer_fee, 0.0)
    }

    fn sell_cost(
        &self,
        _datetime: DateTime<Utc>,
        instrument: &Instrument,
        price: f64,
        number: f64,
    ) -> CostRecord {
        let notional = price * number * instrument.multiplier;
        CostRecord::new(
            self.commission(notional),
            notional * self.stamp_tax_bps / 10_000.0,
            self.transfer_fee,
            0.0,
        )
    }

    fn clone_box(&self) -> Box<dyn CostModel> {
        Box::new(self.clone())
    }
}
