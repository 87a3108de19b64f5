//! Shared state handed to every axum handler.
use std::sync::Arc;

use crate::log::OrderLog;
use crate::model::Trade;
use crate::runtime::SharedBook;

/// Cloneable handle bundle for the HTTP adapter. Cloning is cheap — every
/// field is an `Arc` or a broadcast sender, never the book or log itself.
#[derive(Clone)]
pub struct AppState {
    pub log: Arc<OrderLog>,
    pub book: SharedBook,
    pub trades: tokio::sync::broadcast::Sender<Trade>,
}

impl AppState {
    pub fn new(log: Arc<OrderLog>, book: SharedBook, trades: tokio::sync::broadcast::Sender<Trade>) -> Self {
        Self { log, book, trades }
    }
}
