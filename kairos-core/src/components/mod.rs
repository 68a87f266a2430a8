//! Strategy component contracts consumed by the trading system.
//!
//! Every component is object-safe, `Send`, and deep-cloneable through the
//! `clone_box` pattern, so a cloned system shares no mutable state with its
//! original and sibling systems can run on separate threads. Components
//! receive any engine context they need (trade manager, signal) as call-time
//! borrows; they never store references into the system.

pub mod condition;
pub mod cost_model;
pub mod environment;
pub mod money_manager;
pub mod profit_goal;
pub mod signal;
pub mod slippage;
pub mod stoploss;
pub mod trade_manager;

pub use condition::{Condition, NullCondition};
pub use cost_model::{BpsCost, CostModel, ZeroCost};
pub use environment::{DateRangeEnvironment, Environment, NullEnvironment};
pub use money_manager::{CashRatioManager, FixedCountManager, MoneyManager};
pub use profit_goal::{FixedPercentGoal, NoGoal, ProfitGoal};
pub use signal::{NullSignal, ScriptedSignal, Signal};
pub use slippage::{BpsSlippage, NoSlippage, Slippage};
pub use stoploss::{FixedPercentStop, NoStop, ScriptedStop, Stoploss};
pub use trade_manager::TradeManager;
