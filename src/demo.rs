//! Demo order-flow generator: posts random limit orders against a running
//! engine over HTTP. Not part of the core engine — useful for exercising it
//! by hand or in a smoke test.
use rand::Rng;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

const MIN_PRICE: u64 = 9_800;
const MAX_PRICE: u64 = 10_200;
const MAX_QTY: u64 = 20;
const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Posts random limit orders at roughly 10/sec until `shutdown` fires.
pub async fn run(api_base: &str, shutdown: CancellationToken) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    info!(api_base, "demo order-flow generator starting");

    loop {
        if shutdown.is_cancelled() {
            return Ok(());
        }

        let (side, price, quantity) = {
            let mut rng = rand::rng();
            let side = if rng.random_bool(0.5) { "BUY" } else { "SELL" };
            let price = rng.random_range(MIN_PRICE..=MAX_PRICE);
            let quantity = rng.random_range(1..=MAX_QTY);
            (side, price, quantity)
        };
        let order_id = Uuid::new_v4().to_string();

        let resp = client
            .post(format!("{api_base}/orders"))
            .json(&json!({
                "order_id": order_id,
                "side": side,
                "price": price,
                "quantity": quantity,
            }))
            .send()
            .await;

        match resp {
            Ok(r) if r.status().is_success() => {
                info!(order_id, side, price, quantity, "demo order accepted");
            }
            Ok(r) => warn!(status = %r.status(), "demo order rejected"),
            Err(e) => warn!(error = %e, "demo order request failed"),
        }

        sleep(TICK_INTERVAL).await;
    }
}
