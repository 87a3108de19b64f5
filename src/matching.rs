//! Price-time-priority matching algorithm, invoked from
//! [`crate::book::OrderBook::submit`].
use std::collections::{BTreeMap, VecDeque};

use crate::errors::EngineResult;
use crate::model::{Order, OrderId, Price, Side, Trade};

/// Result of running the incoming order against one side of the book.
pub(crate) struct MatchOutcome {
    /// Trades generated, in the order they were produced.
    pub trades: Vec<Trade>,
    /// Ids of resting orders removed from their FIFO queue during the walk —
    /// either lazily-evicted dead entries, or makers that became terminal
    /// from a fill. The caller is responsible for dropping these from its
    /// id index.
    pub evicted: Vec<OrderId>,
}

/// Runs `incoming` against `opposite` (the book side opposite `incoming.side`)
/// until `incoming` is exhausted or the book no longer crosses its limit.
///
/// `opposite` is mutated in place: fully-matched or lazily-dead resting
/// orders are popped from their price level, and empty price levels are
/// removed from the map.
pub(crate) fn run(
    incoming: &mut Order,
    opposite: &mut BTreeMap<Price, VecDeque<Order>>,
) -> EngineResult<MatchOutcome> {
    let mut trades = Vec::new();
    let mut evicted = Vec::new();

    while incoming.remaining_qty > 0 {
        let best_price = match incoming.side {
            Side::Buy => opposite.keys().next().copied(),
            Side::Sell => opposite.keys().next_back().copied(),
        };
        let Some(p_star) = best_price else {
            break;
        };

        let crosses = match incoming.side {
            Side::Buy => incoming.limit_price >= p_star,
            Side::Sell => incoming.limit_price <= p_star,
        };
        if !crosses {
            break;
        }

        let queue = opposite
            .get_mut(&p_star)
            .expect("best_price came from this map; level must exist");

        loop {
            let Some(maker) = queue.front_mut() else {
                break;
            };

            if !maker.status.is_active() || maker.remaining_qty == 0 {
                let dead = queue.pop_front().expect("front_mut just returned Some");
                evicted.push(dead.id);
                continue;
            }

            let q = incoming.remaining_qty.min(maker.remaining_qty);
            incoming.fill(q)?;
            maker.fill(q)?;

            let (buy_id, sell_id) = match incoming.side {
                Side::Buy => (incoming.id.clone(), maker.id.clone()),
                Side::Sell => (maker.id.clone(), incoming.id.clone()),
            };
            trades.push(Trade::new(buy_id, sell_id, p_star, q)?);

            if maker.status.is_terminal() {
                let done = queue.pop_front().expect("front_mut just returned Some");
                evicted.push(done.id);
            }

            if incoming.remaining_qty == 0 {
                break;
            }
        }

        if queue.is_empty() {
            opposite.remove(&p_star);
        }
    }

    Ok(MatchOutcome { trades, evicted })
}
