use std::sync::Arc;

use tokio::io::BufReader;
use tokio::sync::{broadcast, mpsc, watch};
use tracing_subscriber::EnvFilter;

use assistant::advisor::HttpAdvisor;
use assistant::control::{ControlRouter, Notification};
use assistant::feed::{run_feed, FeedReader};
use assistant::session::run_pipeline;
use assistant::Config;

/// `--feed <path>` overrides the SNAPSHOT_FEED environment variable;
/// "-" reads the feed from stdin.
fn parse_feed_arg() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--feed" {
            return args.next();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut config = Config::from_env();
    if let Some(feed) = parse_feed_arg() {
        config.snapshot_feed = feed;
    }

    let (snapshot_tx, snapshot_rx) = watch::channel(None);
    let (mutation_tx, mutation_rx) = mpsc::channel(64);
    let (active_tx, active_rx) = watch::channel(true);
    let (notify_tx, mut notify_rx) = broadcast::channel(32);
    let (control_tx, control_rx) = mpsc::channel(8);

    let advisor = Arc::new(HttpAdvisor::new(&config));

    tracing::info!(feed = %config.snapshot_feed, "starting snapshot feed");
    let feed_task = if config.snapshot_feed == "-" {
        tokio::spawn(run_feed(
            BufReader::new(tokio::io::stdin()),
            snapshot_tx,
            mutation_tx,
        ))
    } else {
        let file = tokio::fs::File::open(&config.snapshot_feed).await?;
        tokio::spawn(run_feed(BufReader::new(file), snapshot_tx, mutation_tx))
    };

    let router = ControlRouter::new(
        advisor.clone(),
        config.clone(),
        active_tx,
        notify_tx.clone(),
    );
    tokio::spawn(router.run(control_rx));

    let reader = FeedReader::new(snapshot_rx);
    tokio::spawn(run_pipeline(
        advisor,
        reader,
        config,
        mutation_rx,
        notify_tx,
        active_rx,
    ));

    tokio::spawn(async move {
        while let Ok(notification) = notify_rx.recv().await {
            match notification {
                Notification::StateChanged(active) => {
                    tracing::info!(active, "assistant state changed")
                }
                Notification::Analysis(result) => tracing::info!(
                    best_move = %result.best_move,
                    evaluation = result.evaluation,
                    depth = result.depth,
                    "analysis ready"
                ),
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    drop(control_tx);
    feed_task.abort();
    Ok(())
}
