//! System tuning parameters.
//!
//! A typed struct carries the options; a string-keyed surface sits on top
//! for hosts that configure systems dynamically. Unknown keys and wrong
//! value types are hard errors, never silently ignored.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Dynamically typed parameter value for the string surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Bool(bool),
    Int(u32),
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        Self::Int(v)
    }
}

/// All tunables of the trading system, with their engine defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemParams {
    /// Max bars an unfilled delayed order may re-submit before discard.
    pub max_delay_count: u32,
    /// Decisions execute on the next bar (true) or at the decision bar's
    /// close (false).
    pub delay: bool,
    /// Recompute stoploss/quantity/goal from the execution bar instead of
    /// reusing decision-bar values.
    pub delay_use_current_price: bool,
    /// Trailing take-profit is non-decreasing per position.
    pub tp_monotonic: bool,
    /// Take-profit evaluation deferred this many bars after entry.
    pub tp_delay_n: u32,
    /// Suppress the sell-side signal while long.
    pub ignore_sell_sg: bool,
    /// Allow execution on bars where high == low.
    pub can_trade_when_high_eq_low: bool,
    /// Open a long on an environment false→true transition.
    pub ev_open_position: bool,
    /// Open a long on a condition false→true transition.
    pub cn_open_position: bool,
    /// Allow leveraged long entries.
    pub support_borrow_cash: bool,
    /// Enable the short side.
    pub support_borrow_stock: bool,
}

impl Default for SystemParams {
    fn default() -> Self {
        Self {
            max_delay_count: 3,
            delay: true,
            delay_use_current_price: true,
            tp_monotonic: true,
            tp_delay_n: 3,
            ignore_sell_sg: false,
            can_trade_when_high_eq_low: false,
            ev_open_position: false,
            cn_open_position: false,
            support_borrow_cash: false,
            support_borrow_stock: false,
        }
    }
}

impl SystemParams {
    pub fn set(&mut self, key: &str, value: ParamValue) -> Result<(), CoreError> {
        use ParamValue::{Bool, Int};
        match (key, value) {
            ("max_delay_count", Int(v)) => self.max_delay_count = v,
            ("tp_delay_n", Int(v)) => self.tp_delay_n = v,
            ("delay", Bool(v)) => self.delay = v,
            ("delay_use_current_price", Bool(v)) => self.delay_use_current_price = v,
            ("tp_monotonic", Bool(v)) => self.tp_monotonic = v,
            ("ignore_sell_sg", Bool(v)) => self.ignore_sell_sg = v,
            ("can_trade_when_high_eq_low", Bool(v)) => self.can_trade_when_high_eq_low = v,
            ("ev_open_position", Bool(v)) => self.ev_open_position = v,
            ("cn_open_position", Bool(v)) => self.cn_open_position = v,
            ("support_borrow_cash", Bool(v)) => self.support_borrow_cash = v,
            ("support_borrow_stock", Bool(v)) => self.support_borrow_stock = v,
            ("max_delay_count" | "tp_delay_n", Bool(_)) => {
                return Err(CoreError::ParamType { key: key.into(), expected: "int" });
            }
            (
                "delay" | "delay_use_current_price" | "tp_monotonic" | "ignore_sell_sg"
                | "can_trade_when_high_eq_low" | "ev_open_position" | "cn_open_position"
                | "support_borrow_cash" | "support_borrow_stock",
                Int(_),
            ) => {
                return Err(CoreError::ParamType { key: key.into(), expected: "bool" });
            }
            _ => return Err(CoreError::UnknownParam(key.into())),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<ParamValue, CoreError> {
        use ParamValue::{Bool, Int};
        Ok(match key {
            "max_delay_count" => Int(self.max_delay_count),
            "tp_delay_n" => Int(self.tp_delay_n),
            "delay" => Bool(self.delay),
            "delay_use_current_price" => Bool(self.delay_use_current_price),
            "tp_monotonic" => Bool(self.tp_monotonic),
            "ignore_sell_sg" => Bool(self.ignore_sell_sg),
            "can_trade_when_high_eq_low" => Bool(self.can_trade_when_high_eq_low),
            "ev_open_position" => Bool(self.ev_open_position),
            "cn_open_position" => Bool(self.cn_open_position),
            "support_borrow_cash" => Bool(self.support_borrow_cash),
            "support_borrow_stock" => Bool(self.support_borrow_stock),
            _ => return Err(CoreError::UnknownParam(key.into())),
        })
    }
}
