//! Durable, append-only order log: the ingress pipeline that decouples
//! order submission from matching.
//!
//! Backed by `parity-db` so ordering and durability come from a
//! B-tree-indexed column keyed by a monotonic sequence number. A bounded
//! `crossbeam` channel carries just-appended sequence numbers as a
//! lock-free wake-up hint from producer to consumer so the matcher's
//! cursor can block on a bounded interval instead of busy-polling the
//! store.
mod store;

use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::channel::{Receiver, Sender, bounded};
use tracing::warn;

use crate::errors::{EngineError, EngineResult};
use crate::model::{OrderId, Price, Quantity, Side};
use store::LogStore;

const HINT_CHANNEL_CAPACITY: usize = 4096;

/// The kind of a log record. Any on-disk tag beyond `Submit`/`Cancel` is a
/// forward-compatible extension that must be ignored with a warning
/// rather than crash the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Submit,
    Cancel,
}

/// A decoded entry read back off the log.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub seq: u64,
    pub kind: RecordKind,
    pub order_id: OrderId,
    pub side: Side,
    pub limit_price: Price,
    pub quantity: Quantity,
}

/// A record to be appended. The log always stores the quantity the caller
/// submitted, never a live `remaining_qty` — resubmitting an existing
/// order must not underreport what it originally asked for.
pub struct NewRecord {
    pub kind: RecordKind,
    pub order_id: OrderId,
    pub side: Side,
    pub limit_price: Price,
    pub quantity: Quantity,
}

impl NewRecord {
    pub fn submit(order_id: OrderId, side: Side, limit_price: Price, quantity: Quantity) -> Self {
        Self {
            kind: RecordKind::Submit,
            order_id,
            side,
            limit_price,
            quantity,
        }
    }

    /// `side`/`limit_price`/`quantity` are vestigial for a cancel record —
    /// only `order_id` drives matcher behavior — but the framing is kept
    /// uniform across record kinds.
    pub fn cancel(order_id: OrderId) -> Self {
        Self {
            kind: RecordKind::Cancel,
            order_id,
            side: Side::Buy,
            limit_price: 0,
            quantity: 0,
        }
    }
}

/// The durable, ordered, single-consumer-for-this-core order log.
pub struct OrderLog {
    store: LogStore,
    next_seq: AtomicU64,
    hint_tx: Sender<u64>,
    hint_rx: Mutex<Option<Receiver<u64>>>,
}

impl OrderLog {
    /// Opens (or creates) the log directory. Resumes the sequence counter
    /// from the durable watermark if one exists.
    pub fn open(dir: impl AsRef<Path>) -> EngineResult<Self> {
        let store = LogStore::open(dir)?;
        let next_seq = store.last_seq()?.map(|s| s + 1).unwrap_or(0);
        let (hint_tx, hint_rx) = bounded(HINT_CHANNEL_CAPACITY);
        Ok(Self {
            store,
            next_seq: AtomicU64::new(next_seq),
            hint_tx,
            hint_rx: Mutex::new(Some(hint_rx)),
        })
    }

    /// Appends a record. Returns once it is durably enqueued, along with
    /// the sequence number assigned to it.
    pub fn append(&self, record: NewRecord) -> EngineResult<u64> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.store.append(seq, &record)?;
        // Best-effort wake-up hint: a full or disconnected channel never
        // blocks or fails the durable append itself.
        let _ = self.hint_tx.try_send(seq);
        Ok(seq)
    }

    /// Acquires the single cursor over this log, starting from the
    /// beginning. Returns `EngineError::Internal` if a cursor is already
    /// checked out — this core has exactly one consumer (the matcher).
    pub fn cursor(&self) -> EngineResult<Cursor<'_>> {
        let rx = self
            .hint_rx
            .lock()
            .expect("hint_rx mutex poisoned")
            .take()
            .ok_or_else(|| {
                EngineError::Internal("order log already has an active cursor".into())
            })?;
        Ok(Cursor {
            log: self,
            next_expected: 0,
            hint_rx: Some(rx),
        })
    }
}

/// Scoped forward cursor over the order log. Always replays from the
/// beginning — checkpointing to skip replay is a noted extension point,
/// not implemented here.
pub struct Cursor<'a> {
    log: &'a OrderLog,
    next_expected: u64,
    hint_rx: Option<Receiver<u64>>,
}

impl<'a> Cursor<'a> {
    /// Non-blocking read of the next record. `Ok(None)` means "no data
    /// available right now", not end-of-log — more may be appended later.
    /// Unknown record kinds are skipped with a warning, never surfaced as
    /// an error.
    pub fn try_next(&mut self) -> EngineResult<Option<OrderRecord>> {
        loop {
            match self.log.store.read_at(self.next_expected)? {
                None => return Ok(None),
                Some(Ok(record)) => {
                    self.next_expected += 1;
                    return Ok(Some(record));
                }
                Some(Err(store::DecodeOutcome::UnknownKind(seq))) => {
                    warn!(seq, "order log: unknown record kind, skipping");
                    self.next_expected += 1;
                    continue;
                }
            }
        }
    }

    /// Like [`try_next`](Self::try_next), but if nothing is available,
    /// blocks for up to `timeout` on the producer's wake-up hint before
    /// giving up, instead of busy-polling the durable store between
    /// appends.
    pub fn next_with_timeout(&mut self, timeout: Duration) -> EngineResult<Option<OrderRecord>> {
        if let Some(record) = self.try_next()? {
            return Ok(Some(record));
        }
        if let Some(rx) = &self.hint_rx {
            // Any hint (even a stale one for a sequence we've already
            // consumed) is just a reason to re-check the durable store;
            // the real read-of-record always goes through try_next.
            let _ = rx.recv_timeout(timeout);
        } else {
            std::thread::sleep(timeout);
        }
        self.try_next()
    }
}

impl<'a> Drop for Cursor<'a> {
    fn drop(&mut self) {
        if let Some(rx) = self.hint_rx.take() {
            if let Ok(mut guard) = self.log.hint_rx.lock() {
                *guard = Some(rx);
            }
        }
    }
}
