//! Two-sided, price-indexed order book with per-price FIFO queues.
use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::Serialize;

use crate::errors::EngineResult;
use crate::matching;
use crate::model::{Order, OrderId, Price, Quantity, Side};

/// Where a resting order currently lives, so `cancel`/`lookup` can reach the
/// real (not copied) order in `O(1) + scan-of-one-level` instead of scanning
/// the whole book.
#[derive(Clone, Copy)]
struct Locator {
    side: Side,
    price: Price,
}

/// A single visible price level in a [`BookSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct PriceLevel {
    pub price: Price,
    pub quantity: Quantity,
    pub order_count: usize,
}

/// Read-only snapshot of the book, safe to publish to external observers
/// without taking the book's lock for longer than the copy itself.
#[derive(Debug, Clone, Serialize)]
pub struct BookSnapshot {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub trade_count: usize,
}

/// Two-sided order book: `bids` keyed ascending but read highest-first,
/// `asks` keyed ascending and read lowest-first. Each value is a FIFO queue
/// enforcing time priority within a price level.
pub struct OrderBook {
    bids: BTreeMap<Price, VecDeque<Order>>,
    asks: BTreeMap<Price, VecDeque<Order>>,
    by_id: HashMap<OrderId, Locator>,
    trades: Vec<crate::model::Trade>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            by_id: HashMap::new(),
            trades: Vec::new(),
        }
    }

    /// Runs matching against the opposing side; rests any residual remainder
    /// at its limit price. Returns the trades produced by this submission.
    pub fn submit(&mut self, mut order: Order) -> EngineResult<Vec<crate::model::Trade>> {
        let opposite = match order.side {
            Side::Buy => &mut self.asks,
            Side::Sell => &mut self.bids,
        };
        let outcome = matching::run(&mut order, opposite)?;

        for dead_id in &outcome.evicted {
            self.by_id.remove(dead_id);
        }

        if order.remaining_qty > 0 {
            let id = order.id.clone();
            let locator = Locator {
                side: order.side,
                price: order.limit_price,
            };
            let own_side = match order.side {
                Side::Buy => &mut self.bids,
                Side::Sell => &mut self.asks,
            };
            own_side
                .entry(order.limit_price)
                .or_default()
                .push_back(order);
            self.by_id.insert(id, locator);
        }
        // else: order is terminal and was never indexed, so it is
        // unreachable via lookup().

        self.trades.extend(outcome.trades.iter().cloned());
        debug_assert!(self.is_non_crossing(), "book crossed after submit");
        Ok(outcome.trades)
    }

    /// Marks the referenced order CANCELED, `remaining_qty := 0`. Does not
    /// unlink it from its FIFO queue (lazy eviction). Returns
    /// whether the order was cancelable (prior status OPEN/PARTIALLY_FILLED).
    pub fn cancel(&mut self, id: &OrderId) -> bool {
        let Some(locator) = self.by_id.get(id).copied() else {
            return false;
        };
        let side_map = match locator.side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let Some(queue) = side_map.get_mut(&locator.price) else {
            return false;
        };
        match queue.iter_mut().find(|o| &o.id == id) {
            Some(order) => order.cancel(),
            None => false,
        }
    }

    /// Returns the order snapshot if present (resting or lingering
    /// pre-eviction), else `None`.
    pub fn lookup(&self, id: &OrderId) -> Option<Order> {
        let locator = self.by_id.get(id)?;
        let side_map = match locator.side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        side_map
            .get(&locator.price)?
            .iter()
            .find(|o| &o.id == id)
            .cloned()
    }

    /// `(price, aggregate_visible_qty)` at the top of the bid side.
    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        Self::best(&self.bids, true)
    }

    /// `(price, aggregate_visible_qty)` at the top of the ask side.
    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        Self::best(&self.asks, false)
    }

    fn best(side: &BTreeMap<Price, VecDeque<Order>>, descending: bool) -> Option<(Price, Quantity)> {
        let levels: Box<dyn Iterator<Item = (&Price, &VecDeque<Order>)>> = if descending {
            Box::new(side.iter().rev())
        } else {
            Box::new(side.iter())
        };
        for (price, queue) in levels {
            let qty: Quantity = queue
                .iter()
                .filter(|o| o.status.is_active() && o.remaining_qty > 0)
                .map(|o| o.remaining_qty)
                .sum();
            if qty > 0 {
                return Some((*price, qty));
            }
        }
        None
    }

    /// Count of resting (active) orders on a side, across all price levels.
    pub fn resting_count(&self, side: Side) -> usize {
        let map = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        map.values()
            .map(|q| q.iter().filter(|o| o.status.is_active()).count())
            .sum()
    }

    /// Cumulative count of trades ever produced by this book.
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    /// A depth-limited, serializable view of both sides.
    pub fn snapshot(&self, depth: usize) -> BookSnapshot {
        let levels = |side: &BTreeMap<Price, VecDeque<Order>>, descending: bool| {
            let iter: Box<dyn Iterator<Item = (&Price, &VecDeque<Order>)>> = if descending {
                Box::new(side.iter().rev())
            } else {
                Box::new(side.iter())
            };
            iter.filter_map(|(price, queue)| {
                let active: Vec<_> = queue.iter().filter(|o| o.status.is_active()).collect();
                if active.is_empty() {
                    return None;
                }
                Some(PriceLevel {
                    price: *price,
                    quantity: active.iter().map(|o| o.remaining_qty).sum(),
                    order_count: active.len(),
                })
            })
            .take(depth)
            .collect()
        };
        BookSnapshot {
            bids: levels(&self.bids, true),
            asks: levels(&self.asks, false),
            trade_count: self.trades.len(),
        }
    }

    /// Non-crossing invariant: after any `submit`, either one side
    /// is empty or `best_bid < best_ask`.
    fn is_non_crossing(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => bid < ask,
            _ => true,
        }
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}
