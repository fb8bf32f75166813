//! tacstore - headless TAK sync client
//!
//! Fetches the initial item snapshot over REST, then keeps the store in
//! sync from the WebSocket push channel, logging the diff of every apply.
//! When the push channel stays down, falls back to polling full snapshots.

use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tacstore::transport::ws::{self, WsConfig};
use tacstore::{apply_event, Args, ItemDiff, ItemStore, RestClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("tacstore={log_level},info").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!(server = %args.server_url, "starting tacstore");

    let rest = RestClient::new(&args.server_url)?;
    // The store lives here, at the composition root, and is passed down by
    // reference - there is no ambient global.
    let mut store = ItemStore::new();

    match rest.fetch_items().await {
        Ok(items) => {
            let diff = store.apply_snapshot(&items, false);
            log_diff("snapshot", &diff, &store);
        }
        Err(e) => warn!("initial snapshot failed: {e}"),
    }

    loop {
        let (tx, mut rx) = mpsc::channel(64);
        let cfg = WsConfig {
            url: args.effective_ws_url(),
            max_retries: args.ws_max_retries,
            base_backoff: Duration::from_millis(args.ws_backoff_ms),
        };
        let reader = tokio::spawn(ws::run(cfg, tx));

        while let Some(event) = rx.recv().await {
            if let Some(diff) = apply_event(&mut store, event) {
                if !diff.is_empty() {
                    log_diff("delta", &diff, &store);
                }
            }
        }

        match reader.await {
            Ok(Ok(())) => break,
            Ok(Err(e)) => warn!("push channel lost: {e}; polling until it recovers"),
            Err(e) => error!("websocket task failed: {e}"),
        }

        // One polling round, then try the push channel again.
        tokio::time::sleep(Duration::from_secs(args.poll_interval_secs)).await;
        match rest.fetch_items().await {
            Ok(items) => {
                let diff = store.apply_snapshot(&items, false);
                if !diff.is_empty() {
                    log_diff("poll", &diff, &store);
                }
            }
            Err(e) => warn!("snapshot poll failed: {e}"),
        }
    }

    Ok(())
}

fn log_diff(source: &str, diff: &ItemDiff, store: &ItemStore) {
    info!(
        source,
        added = diff.added.len(),
        updated = diff.updated.len(),
        removed = diff.removed.len(),
        total = store.len(),
        revision = store.revision(),
        "store updated"
    );
}
