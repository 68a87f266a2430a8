//! Kairos core engine.
//!
//! Provides the bar-by-bar trading system state machine, its domain
//! vocabulary (bars, trades, positions, pending orders), the pluggable
//! strategy component traits, and a small simulation account for running
//! the machine end-to-end.

pub mod account;
pub mod components;
pub mod domain;
pub mod error;
pub mod system;

pub use error::CoreError;
