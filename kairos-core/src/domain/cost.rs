//! Trade cost breakdown.

use serde::{Deserialize, Serialize};

/// Itemised cost of one trade. `total` is always the sum of the components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub commission: f64,
    pub stamp_tax: f64,
    pub transfer_fee: f64,
    pub others: f64,
    pub total: f64,
}

impl CostRecord {
    pub fn new(commission: f64, stamp_tax: f64, transfer_fee: f64, others: f64) -> Self {
        Self {
            commission,
            stamp_tax,
            transfer_fee,
            others,
            total: commission + stamp_tax + transfer_fee + others,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

impl Default for CostRecord {
    fn default() -> Self {
        Self::zero()
    }
}
