//! HTTP contract tests for the submission adapter, using axum's
//! `oneshot` test harness.
use std::sync::{Arc, RwLock};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use clob_engine::{
    api::router,
    book::OrderBook,
    log::OrderLog,
    model::{Order, OrderId, Side},
    runtime::SharedBook,
    state::AppState,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::{TempDir, tempdir};
use tower::ServiceExt;

/// The HTTP adapter never mutates the book directly — only the matcher
/// does, by replaying the log — so tests that need a pre-populated book
/// seed it directly through the handle returned here rather than going
/// through `POST /orders` (which only appends to the log).
fn test_app() -> (Router, SharedBook, TempDir) {
    let dir = tempdir().unwrap();
    let log = Arc::new(OrderLog::open(dir.path()).unwrap());
    let book = Arc::new(RwLock::new(OrderBook::new()));
    let (trades_tx, _) = tokio::sync::broadcast::channel(16);
    let state = AppState::new(log, book.clone(), trades_tx);
    (router(state), book, dir)
}

async fn body_json(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn submit_accepts_a_valid_order_and_returns_a_sequence_number() {
    let (app, _book, _tmp) = test_app();
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "order_id": "o1",
                        "side": "BUY",
                        "price": 100,
                        "quantity": 5
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let body = body_json(res).await;
    assert_eq!(body["sequence"], 0);
}

#[tokio::test]
async fn submit_rejects_zero_price_with_a_400_and_never_logs_it() {
    let (app, _book, _tmp) = test_app();
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "order_id": "o1",
                        "side": "BUY",
                        "price": 0,
                        "quantity": 5
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert!(body["error"].is_string());

    // Nothing was appended: the very next accepted submit still gets seq 0.
    let accept = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/orders")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"order_id": "o2", "side": "SELL", "price": 1, "quantity": 1})
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(accept).await;
    assert_eq!(body["sequence"], 0);
}

#[tokio::test]
async fn cancel_accepts_a_resting_order_and_returns_a_sequence_number() {
    let (app, book, _tmp) = test_app();
    book.write()
        .unwrap()
        .submit(Order::new(OrderId::new("o1").unwrap(), Side::Buy, 100, 5).unwrap())
        .unwrap();

    let res = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/orders/o1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn cancel_of_an_unknown_order_is_rejected_with_a_404() {
    let (app, _book, _tmp) = test_app();
    let res = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/orders/ghost")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = body_json(res).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn get_book_returns_an_empty_snapshot_for_a_fresh_engine() {
    let (app, _book, _tmp) = test_app();
    let res = app
        .oneshot(
            Request::builder()
                .uri("/book")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["bids"], json!([]));
    assert_eq!(body["asks"], json!([]));
    assert_eq!(body["trade_count"], 0);
}

#[tokio::test]
async fn get_stats_reports_no_resting_orders_for_a_fresh_engine() {
    let (app, _book, _tmp) = test_app();
    let res = app
        .oneshot(
            Request::builder()
                .uri("/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["resting_buy"], 0);
    assert_eq!(body["resting_sell"], 0);
    assert_eq!(body["trade_count"], 0);
    assert!(body["best_bid"].is_null());
}
