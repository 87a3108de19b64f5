//! Order and trade value types: immutable identity plus mutable fill state.
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Price in ticks. Always `> 0` for a validly constructed [`Order`].
pub type Price = u64;

/// Quantity in lots. Always `> 0` for a validly constructed [`Order`].
pub type Quantity = u64;

/// Opaque, non-empty identifier, unique across the lifetime of the book.
///
/// Uniqueness is the submitter's responsibility; the book does not reject
/// duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    pub fn new(raw: impl Into<String>) -> Result<Self, EngineError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(EngineError::InvalidArg("order id must not be empty".into()));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an incoming order of this side matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Lifecycle state of a resting or terminal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Canceled,
}

impl OrderStatus {
    /// `true` once no further fill or cancel can change this order.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Canceled)
    }

    /// `true` for statuses eligible to rest in / be matched from a book queue.
    pub fn is_active(self) -> bool {
        matches!(self, OrderStatus::Open | OrderStatus::PartiallyFilled)
    }
}

/// `{ id, side, limit_price, remaining_qty, status }`.
///
/// `id`, `side`, and `limit_price` are immutable after construction.
/// `remaining_qty` is monotonically non-increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub limit_price: Price,
    pub remaining_qty: Quantity,
    pub status: OrderStatus,
}

impl Order {
    /// Fails with `INVALID_ARG` if `price <= 0`, `qty <= 0`, or `id` is empty.
    /// Initial status is `OPEN`.
    pub fn new(id: OrderId, side: Side, price: Price, qty: Quantity) -> Result<Self, EngineError> {
        if price == 0 {
            return Err(EngineError::InvalidArg("price must be > 0".into()));
        }
        if qty == 0 {
            return Err(EngineError::InvalidArg("quantity must be > 0".into()));
        }
        Ok(Self {
            id,
            side,
            limit_price: price,
            remaining_qty: qty,
            status: OrderStatus::Open,
        })
    }

    /// Precondition: `0 < q <= remaining_qty`. Transitions status accordingly.
    ///
    /// A violated precondition is an invariant break (duplicate fill past
    /// terminal, or overfill) and is surfaced as `EngineError::Internal`
    /// rather than silently clamped — a negative remainder is a fatal
    /// programmer error, not a recoverable one.
    pub fn fill(&mut self, q: Quantity) -> Result<(), EngineError> {
        if self.status.is_terminal() {
            return Err(EngineError::Internal(format!(
                "fill on terminal order {}",
                self.id
            )));
        }
        if q == 0 || q > self.remaining_qty {
            return Err(EngineError::Internal(format!(
                "invalid fill quantity {} against remaining {} on order {}",
                q, self.remaining_qty, self.id
            )));
        }
        self.remaining_qty -= q;
        self.status = if self.remaining_qty == 0 {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        Ok(())
    }

    /// Sets status to `CANCELED` and `remaining_qty := 0`.
    ///
    /// Idempotent when already `CANCELED`. No-op on `FILLED` (already
    /// terminal). Returns whether the order transitioned as a result (i.e.
    /// it was previously cancelable).
    pub fn cancel(&mut self) -> bool {
        match self.status {
            OrderStatus::Open | OrderStatus::PartiallyFilled => {
                self.status = OrderStatus::Canceled;
                self.remaining_qty = 0;
                true
            }
            OrderStatus::Canceled | OrderStatus::Filled => false,
        }
    }
}

/// `{ buy_order_id, sell_order_id, price, quantity }`, all positive, immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub price: Price,
    pub quantity: Quantity,
}

impl Trade {
    pub fn new(
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        price: Price,
        quantity: Quantity,
    ) -> Result<Self, EngineError> {
        if price == 0 {
            return Err(EngineError::InvalidArg("trade price must be > 0".into()));
        }
        if quantity == 0 {
            return Err(EngineError::InvalidArg("trade quantity must be > 0".into()));
        }
        Ok(Self {
            buy_order_id,
            sell_order_id,
            price,
            quantity,
        })
    }
}
