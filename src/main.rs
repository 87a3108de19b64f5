use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use clap::Parser;
use clob_engine::book::OrderBook;
use clob_engine::log::OrderLog;
use clob_engine::runtime;
use clob_engine::state::AppState;
use clob_engine::utils::shutdown_token;
use clob_engine::{api, demo};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// A single-instrument central limit order book engine.
#[derive(Parser)]
#[command(name = "clob-engine")]
#[command(version, about = "A durable, price-time-priority matching engine")]
struct Cli {
    /// Directory for the durable order log. Defaults to a fresh temp
    /// directory, which is fine for development but discards history on
    /// every restart — pass a stable path for anything durable.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Port the HTTP submission adapter listens on.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Also run the demo order-flow generator against the local server.
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let log_dir = match cli.log_dir {
        Some(dir) => dir,
        None => {
            let path = std::env::temp_dir().join(format!("clob-engine-{}", std::process::id()));
            std::fs::create_dir_all(&path)?;
            tracing::warn!(path = %path.display(), "no --log-dir given; using an ephemeral directory");
            path
        }
    };

    let log = Arc::new(OrderLog::open(&log_dir)?);
    let book = Arc::new(RwLock::new(OrderBook::new()));
    let (trades_tx, _) = tokio::sync::broadcast::channel(1024);

    let shutdown = shutdown_token();

    let matcher_log = log.clone();
    let matcher_book = book.clone();
    let matcher_trades = trades_tx.clone();
    let matcher_shutdown = shutdown.clone();
    let matcher_handle = std::thread::spawn(move || {
        if let Err(e) = runtime::run(matcher_log, matcher_book, matcher_trades, matcher_shutdown) {
            tracing::error!(error = %e, "matcher runtime exited with an error");
        }
    });

    let state = AppState::new(log, book, trades_tx);
    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cli.port)).await?;
    tracing::info!(port = cli.port, "HTTP submission adapter listening");

    let server_shutdown = shutdown.clone();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
    });

    if cli.demo {
        let base = format!("http://127.0.0.1:{}", cli.port);
        let demo_shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = demo::run(&base, demo_shutdown).await {
                tracing::error!(error = %e, "demo order-flow generator exited with an error");
            }
        });
    }

    server_handle.await??;
    matcher_handle
        .join()
        .map_err(|_| anyhow::anyhow!("matcher thread panicked"))?;
    Ok(())
}
