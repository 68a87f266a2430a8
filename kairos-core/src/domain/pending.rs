//! Deferred-order buffer.
//!
//! A decision made on bar N executes on bar N+1 (or later). Each direction
//! (long buy/sell, short sell/cover) holds at most one live request at a
//! time; a second decision in the same direction coalesces into the buffer
//! instead of queueing. The four buffers share one shape, so they live in an
//! array indexed by [`RequestSlot`] in dispatch priority order.

use crate::domain::{Business, TradeOrigin};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four request directions, in the order they are dispatched on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestSlot {
    Buy,
    Sell,
    SellShort,
    BuyShort,
}

impl RequestSlot {
    pub const DISPATCH_ORDER: [RequestSlot; 4] =
        [Self::Buy, Self::Sell, Self::SellShort, Self::BuyShort];

    fn index(self) -> usize {
        match self {
            Self::Buy => 0,
            Self::Sell => 1,
            Self::SellShort => 2,
            Self::BuyShort => 3,
        }
    }

    pub fn business(self) -> Business {
        match self {
            Self::Buy => Business::Buy,
            Self::Sell => Business::Sell,
            Self::SellShort => Business::SellShort,
            Self::BuyShort => Business::BuyShort,
        }
    }
}

/// One buffered order decision awaiting execution on a later bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub business: Business,
    pub origin: TradeOrigin,
    /// Bar on which the (latest) decision was made.
    pub datetime: DateTime<Utc>,
    pub plan_price: f64,
    pub stoploss: f64,
    pub goal: f64,
    pub number: f64,
    /// How many bars this request has been submitted on.
    pub count: u32,
}

/// The four per-direction buffers carried across bars.
///
/// Deliberately not serialized with the system: a stopped-then-resumed
/// backtest restarts on a bar boundary with empty buffers.
#[derive(Debug, Clone, Default)]
pub struct RequestBook {
    slots: [Option<PendingOrder>; 4],
}

impl RequestBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: RequestSlot) -> Option<&PendingOrder> {
        self.slots[slot.index()].as_ref()
    }

    pub fn get_mut(&mut self, slot: RequestSlot) -> Option<&mut PendingOrder> {
        self.slots[slot.index()].as_mut()
    }

    pub fn put(&mut self, slot: RequestSlot, order: PendingOrder) {
        self.slots[slot.index()] = Some(order);
    }

    pub fn clear(&mut self, slot: RequestSlot) {
        self.slots[slot.index()] = None;
    }

    pub fn clear_all(&mut self) {
        self.slots = Default::default();
    }

    /// First live request in dispatch priority order, if any.
    pub fn first_pending(&self) -> Option<RequestSlot> {
        RequestSlot::DISPATCH_ORDER
            .into_iter()
            .find(|s| self.get(*s).is_some())
    }

    pub fn any_pending(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }
}
