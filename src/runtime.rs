//! Matcher runtime: the single execution context that owns the
//! [`OrderBook`] and is the only thing that ever calls `submit`/`cancel` on
//! it. Runs on its own dedicated OS thread rather than a tokio task, so a
//! long matching burst never competes with the HTTP server's async tasks
//! for worker-pool time.
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::book::OrderBook;
use crate::errors::EngineResult;
use crate::log::{OrderLog, RecordKind};
use crate::model::{Order, OrderId, Trade};

/// How long the matcher blocks on the log's wake-up hint before re-checking
/// the shutdown flag. Bounds worst-case shutdown latency when idle.
const IDLE_POLL: Duration = Duration::from_millis(200);

/// Safe-publish handle the HTTP adapter reads from: a lock taken only for
/// the duration of a snapshot/lookup, never held across matching.
pub type SharedBook = Arc<RwLock<OrderBook>>;

/// Runs the matcher loop until `shutdown` is cancelled or the log cursor
/// reports a fatal error. Replays the entire log from the beginning,
/// deterministically reproducing every trade the engine has ever produced
/// before it starts consuming newly appended records.
///
/// `trades_out` publishes every trade produced, in order, for any number of
/// subscribers (the HTTP adapter's `/stats` and demo tooling). A lagging or
/// absent subscriber never blocks the matcher — `broadcast::Sender::send`
/// only fails when there are zero receivers, which is not an error here.
pub fn run(
    log: Arc<OrderLog>,
    book: SharedBook,
    trades_out: tokio::sync::broadcast::Sender<Trade>,
    shutdown: CancellationToken,
) -> EngineResult<()> {
    let mut cursor = log.cursor()?;
    info!("matcher runtime starting replay from the beginning of the log");

    loop {
        if shutdown.is_cancelled() {
            info!("matcher runtime shutting down");
            return Ok(());
        }

        match cursor.next_with_timeout(IDLE_POLL) {
            Ok(Some(record)) => {
                let order_id = record.order_id.clone();
                let result = match record.kind {
                    RecordKind::Submit => apply_submit(&book, &order_id, record),
                    RecordKind::Cancel => {
                        apply_cancel(&book, &order_id);
                        Ok(Vec::new())
                    }
                };
                match result {
                    Ok(trades) => {
                        for trade in trades {
                            // Zero subscribers is a normal state (no one's
                            // listening yet); anything else would mean the
                            // channel itself broke, which can't happen for
                            // a live Sender.
                            let _ = trades_out.send(trade);
                        }
                    }
                    Err(e) => {
                        error!(order_id = %order_id, error = %e, "matching failed on log record");
                        return Err(e);
                    }
                }
            }
            Ok(None) => continue,
            Err(e) => {
                error!(error = %e, "order log read failed; matcher stopping");
                return Err(e);
            }
        }
    }
}

fn apply_submit(
    book: &SharedBook,
    order_id: &OrderId,
    record: crate::log::OrderRecord,
) -> EngineResult<Vec<Trade>> {
    let order = Order::new(
        order_id.clone(),
        record.side,
        record.limit_price,
        record.quantity,
    )?;
    let mut book = book.write().expect("order book lock poisoned");
    book.submit(order)
}

fn apply_cancel(book: &SharedBook, order_id: &OrderId) {
    let mut book = book.write().expect("order book lock poisoned");
    if !book.cancel(order_id) {
        warn!(order_id = %order_id, "cancel record referenced an unknown or already-terminal order");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::NewRecord;
    use crate::model::Side;
    use std::thread;
    use tempfile::tempdir;

    fn oid(s: &str) -> OrderId {
        OrderId::new(s).unwrap()
    }

    #[test]
    fn replays_log_and_produces_trades() {
        let dir = tempdir().unwrap();
        let log = Arc::new(OrderLog::open(dir.path()).unwrap());
        log.append(NewRecord::submit(oid("s1"), Side::Sell, 100, 5))
            .unwrap();
        log.append(NewRecord::submit(oid("b1"), Side::Buy, 101, 5))
            .unwrap();

        let book: SharedBook = Arc::new(RwLock::new(OrderBook::new()));
        let (tx, mut rx) = tokio::sync::broadcast::channel(16);
        let shutdown = CancellationToken::new();

        let runtime_log = log.clone();
        let runtime_book = book.clone();
        let runtime_shutdown = shutdown.clone();
        let handle = thread::spawn(move || run(runtime_log, runtime_book, tx, runtime_shutdown));

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let trade = rt
            .block_on(tokio::time::timeout(Duration::from_secs(2), rx.recv()))
            .unwrap()
            .unwrap();
        assert_eq!(trade.quantity, 5);
        assert_eq!(trade.price, 100);

        shutdown.cancel();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn cancel_record_for_unknown_order_does_not_fail_the_loop() {
        let dir = tempdir().unwrap();
        let log = Arc::new(OrderLog::open(dir.path()).unwrap());
        log.append(NewRecord::cancel(oid("ghost"))).unwrap();

        let book: SharedBook = Arc::new(RwLock::new(OrderBook::new()));
        let (tx, _rx) = tokio::sync::broadcast::channel(16);
        let shutdown = CancellationToken::new();

        let runtime_log = log.clone();
        let runtime_book = book.clone();
        let runtime_shutdown = shutdown.clone();
        let handle = thread::spawn(move || run(runtime_log, runtime_book, tx, runtime_shutdown));

        thread::sleep(Duration::from_millis(50));
        shutdown.cancel();
        handle.join().unwrap().unwrap();
    }
}
