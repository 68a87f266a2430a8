//! The per-bar trading system state machine.

pub mod machine;
pub mod params;

pub use machine::TradingSystem;
pub use params::{ParamValue, SystemParams};
