//! ParityDB-backed physical layer for [`super::OrderLog`].
//!
//! Key layout: column 0 holds records keyed by big-endian `u64` sequence
//! number (B-tree indexed, so `get` is a direct point lookup); column 1
//! holds a single metadata key, `"last_seq"`, updated atomically in the
//! same commit batch as every append so reopening never needs to scan for
//! the highest key.
use std::path::Path;

use bincode::config::{self, standard};
use parity_db::{ColId, Db, Options};

use super::{NewRecord, OrderRecord, RecordKind};
use crate::errors::EngineResult;
use crate::model::{OrderId, Side};

const RECORDS_COL: ColId = 0;
const META_COL: ColId = 1;
const LAST_SEQ_KEY: &[u8] = b"last_seq";

const KIND_SUBMIT: u8 = 0;
const KIND_CANCEL: u8 = 1;

const SIDE_BUY: u8 = 0;
const SIDE_SELL: u8 = 1;

/// On-disk shape of a log entry. Deliberately flat and always stores the
/// quantity as submitted — never a live `remaining_qty` — so replay can
/// never desync from what was actually asked for.
#[derive(bincode::Encode, bincode::Decode)]
struct RawRecord {
    kind: u8,
    order_id: String,
    side: u8,
    price: u64,
    quantity: u64,
}

/// Outcome of decoding one stored record: either a well-formed
/// [`OrderRecord`], or a kind byte this version doesn't recognize.
pub(super) enum DecodeOutcome {
    UnknownKind(u64),
}

pub(super) struct LogStore {
    db: Db,
}

impl LogStore {
    pub(super) fn open(dir: impl AsRef<Path>) -> EngineResult<Self> {
        let mut opts = Options::with_columns(dir.as_ref(), 2);
        opts.columns[RECORDS_COL as usize].btree_index = true;
        let db = Db::open_or_create(&opts)?;
        Ok(Self { db })
    }

    pub(super) fn last_seq(&self) -> EngineResult<Option<u64>> {
        match self.db.get(META_COL, LAST_SEQ_KEY)? {
            None => Ok(None),
            Some(bytes) => {
                let arr: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| crate::errors::EngineError::Decode("bad last_seq watermark".into()))?;
                Ok(Some(u64::from_be_bytes(arr)))
            }
        }
    }

    pub(super) fn append(&self, seq: u64, record: &NewRecord) -> EngineResult<()> {
        let raw = RawRecord {
            kind: match record.kind {
                RecordKind::Submit => KIND_SUBMIT,
                RecordKind::Cancel => KIND_CANCEL,
            },
            order_id: record.order_id.as_str().to_string(),
            side: match record.side {
                Side::Buy => SIDE_BUY,
                Side::Sell => SIDE_SELL,
            },
            price: record.limit_price,
            quantity: record.quantity,
        };
        let value = bincode::encode_to_vec(&raw, standard())?;
        self.db.commit(vec![
            (RECORDS_COL, seq.to_be_bytes().to_vec(), Some(value)),
            (
                META_COL,
                LAST_SEQ_KEY.to_vec(),
                Some(seq.to_be_bytes().to_vec()),
            ),
        ])?;
        Ok(())
    }

    /// `Ok(None)`: nothing stored at `seq` yet. `Ok(Some(Ok(_)))`: a decoded
    /// record. `Ok(Some(Err(UnknownKind)))`: stored, but its kind byte isn't
    /// one this build recognizes.
    pub(super) fn read_at(
        &self,
        seq: u64,
    ) -> EngineResult<Option<Result<OrderRecord, DecodeOutcome>>> {
        let Some(bytes) = self.db.get(RECORDS_COL, &seq.to_be_bytes())? else {
            return Ok(None);
        };
        let (raw, _): (RawRecord, usize) =
            bincode::decode_from_slice(&bytes, config::standard())?;

        let kind = match raw.kind {
            KIND_SUBMIT => RecordKind::Submit,
            KIND_CANCEL => RecordKind::Cancel,
            _ => return Ok(Some(Err(DecodeOutcome::UnknownKind(seq)))),
        };
        let side = if raw.side == SIDE_SELL {
            Side::Sell
        } else {
            Side::Buy
        };
        let order_id = OrderId::new(raw.order_id)
            .map_err(|e| crate::errors::EngineError::Decode(e.to_string()))?;

        Ok(Some(Ok(OrderRecord {
            seq,
            kind,
            order_id,
            side,
            limit_price: raw.price,
            quantity: raw.quantity,
        })))
    }
}
