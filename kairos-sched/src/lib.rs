//! Kairos timer scheduler.
//!
//! Accepts windowed timer specifications and invokes their callbacks on a
//! private worker pool at or after the scheduled instants. One detector
//! thread owns a min-heap of fire entries; callbacks never run on the
//! detector.

pub mod error;
mod timer;
pub mod scheduler;

pub use error::SchedError;
pub use scheduler::{TimerId, TimerScheduler, REPEAT_FOREVER};
