//! HTTP submission adapter. Thin: every handler does validation,
//! then a single durable-log append, and nothing else — matching happens
//! asynchronously in [`crate::runtime`].
use axum::{
    Json, Router,
    body::Bytes,
    extract::{FromRequest, Path, Query, Request, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::warn;

use crate::book::BookSnapshot;
use crate::errors::EngineError;
use crate::log::NewRecord;
use crate::model::{OrderId, Price, Quantity, Side};
use crate::state::AppState;

type ApiErr = (StatusCode, Json<serde_json::Value>);

fn err(status: StatusCode, msg: impl AsRef<str>) -> ApiErr {
    (status, Json(json!({ "error": msg.as_ref() })))
}

/// Maps the engine's error taxonomy onto HTTP status codes:
/// `INVALID_ARG` -> 400, `NOT_FOUND` -> 404, everything else is a server-side
/// failure the caller can't act on -> 500.
fn engine_err_response(e: &EngineError) -> ApiErr {
    match e {
        EngineError::InvalidArg(msg) => err(StatusCode::BAD_REQUEST, msg),
        EngineError::NotFound(msg) => err(StatusCode::NOT_FOUND, msg),
        EngineError::Io(msg) | EngineError::Decode(msg) | EngineError::Internal(msg) => {
            err(StatusCode::INTERNAL_SERVER_ERROR, msg)
        }
    }
}

/// A JSON extractor that logs the request body on a deserialization
/// failure, so a rejected order leaves a trail instead of a bare 422.
pub struct LoggedJson<T>(pub T);

impl<S, T> FromRequest<S> for LoggedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiErr;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let method = req.method().clone();
        let uri = req.uri().clone();
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| err(StatusCode::BAD_REQUEST, e.to_string()))?;

        match serde_json::from_slice::<T>(&bytes) {
            Ok(val) => Ok(LoggedJson(val)),
            Err(e) => {
                let preview = String::from_utf8_lossy(&bytes);
                let preview = &preview[..preview.len().min(4096)];
                warn!(
                    error = %e, %method, uri = %uri, body_preview = %preview,
                    "order rejected: JSON deserialization failed"
                );
                Err(err(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
            }
        }
    }
}

/// Request body for `POST /orders`. The caller mints `order_id` — the
/// engine never generates ids of its own.
#[derive(Deserialize)]
pub struct NewOrder {
    pub order_id: String,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

#[derive(Serialize)]
pub struct Accepted {
    pub sequence: u64,
}

#[derive(Serialize)]
pub struct Stats {
    pub best_bid: Option<(Price, Quantity)>,
    pub best_ask: Option<(Price, Quantity)>,
    pub resting_buy: usize,
    pub resting_sell: usize,
    pub trade_count: usize,
}

fn default_depth() -> usize {
    50
}

#[derive(Deserialize)]
pub struct BookQuery {
    #[serde(default = "default_depth")]
    depth: usize,
}

/// `POST /orders` — validates, then appends a `Submit` record. Acceptance
/// never implies execution: the caller learns the outcome later, either by
/// polling `/book`/`/stats` or via out-of-band trade delivery.
pub async fn submit_order(
    State(state): State<AppState>,
    LoggedJson(body): LoggedJson<NewOrder>,
) -> Result<(StatusCode, Json<Accepted>), ApiErr> {
    let order_id = OrderId::new(body.order_id).map_err(|e| engine_err_response(&e))?;
    if body.price == 0 {
        return Err(err(StatusCode::BAD_REQUEST, "price must be > 0"));
    }
    if body.quantity == 0 {
        return Err(err(StatusCode::BAD_REQUEST, "quantity must be > 0"));
    }

    let sequence = state
        .log
        .append(NewRecord::submit(order_id, body.side, body.price, body.quantity))
        .map_err(|e| engine_err_response(&e))?;

    Ok((StatusCode::ACCEPTED, Json(Accepted { sequence })))
}

/// `DELETE /orders/{id}` — 404s against the snapshot book for an unknown or
/// already-terminal id, otherwise appends a `Cancel` record. The 202 is an
/// acceptance, not a confirmation that the order was actually canceled
/// before it matched.
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Accepted>), ApiErr> {
    let order_id = OrderId::new(id).map_err(|e| engine_err_response(&e))?;

    // Checked against the latest safe-published snapshot, not the log
    // itself: a cheap rejection for the common "typo'd id" case. This is
    // necessarily racy against concurrent cancels/fills — the authoritative
    // outcome is still decided by the matcher replaying the log in order.
    {
        let book = state.book.read().expect("order book lock poisoned");
        match book.lookup(&order_id) {
            Some(order) if order.status.is_active() => {}
            _ => {
                return Err(engine_err_response(&EngineError::NotFound(format!(
                    "no active order with id {order_id}"
                ))));
            }
        }
    }

    let sequence = state
        .log
        .append(NewRecord::cancel(order_id))
        .map_err(|e| engine_err_response(&e))?;
    Ok((StatusCode::ACCEPTED, Json(Accepted { sequence })))
}

/// `GET /book` — a depth-limited, read-only snapshot of both sides.
pub async fn get_book(
    State(state): State<AppState>,
    Query(q): Query<BookQuery>,
) -> Json<BookSnapshot> {
    let depth = q.depth.min(1000);
    let book = state.book.read().expect("order book lock poisoned");
    Json(book.snapshot(depth))
}

/// `GET /stats` — top-of-book prices, resting counts, cumulative trades.
pub async fn get_stats(State(state): State<AppState>) -> Json<Stats> {
    let book = state.book.read().expect("order book lock poisoned");
    Json(Stats {
        best_bid: book.best_bid(),
        best_ask: book.best_ask(),
        resting_buy: book.resting_count(Side::Buy),
        resting_sell: book.resting_count(Side::Sell),
        trade_count: book.trade_count(),
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/orders", post(submit_order))
        .route("/orders/{id}", delete(cancel_order))
        .route("/book", get(get_book))
        .route("/stats", get(get_stats))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(
                    DefaultMakeSpan::new()
                        .include_headers(false)
                        .level(tracing::Level::TRACE),
                )
                .on_response(DefaultOnResponse::new().level(tracing::Level::TRACE)),
        )
        .with_state(state)
}
