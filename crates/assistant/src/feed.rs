//! Snapshot feed: the NDJSON stream published by the page shim.
//!
//! Each line is one [`FeedEvent`]: either a full geometry snapshot, which
//! replaces the previous one, or a categorized page mutation. Snapshots go
//! onto a watch channel so the pipeline always polls the latest one;
//! mutations are forwarded in order.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use board_reader::observer::BoardMutation;
use board_reader::snapshot::{BoardReader, BoardSnapshot};

/// One line of the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedEvent {
    Snapshot(BoardSnapshot),
    Mutation(BoardMutation),
}

/// [`BoardReader`] over the most recent snapshot the feed published.
#[derive(Clone)]
pub struct FeedReader {
    rx: watch::Receiver<Option<BoardSnapshot>>,
}

impl FeedReader {
    pub fn new(rx: watch::Receiver<Option<BoardSnapshot>>) -> Self {
        Self { rx }
    }
}

impl BoardReader for FeedReader {
    fn snapshot(&mut self) -> Option<BoardSnapshot> {
        self.rx.borrow().clone()
    }
}

/// Consume feed lines until end of input. Malformed lines are logged and
/// skipped; the stream keeps going.
pub async fn run_feed<R>(
    input: R,
    snapshot_tx: watch::Sender<Option<BoardSnapshot>>,
    mutation_tx: mpsc::Sender<BoardMutation>,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<FeedEvent>(line) {
                    Ok(FeedEvent::Snapshot(snapshot)) => {
                        debug!(pieces = snapshot.pieces.len(), "snapshot updated");
                        let _ = snapshot_tx.send(Some(snapshot));
                    }
                    Ok(FeedEvent::Mutation(mutation)) => {
                        if mutation_tx.send(mutation).await.is_err() {
                            info!("mutation channel closed, feed exiting");
                            return;
                        }
                    }
                    Err(e) => warn!(error = %e, "skipping malformed feed line"),
                }
            }
            Ok(None) => {
                info!("feed reached end of input");
                return;
            }
            Err(e) => {
                warn!(error = %e, "feed read error");
                return;
            }
        }
    }
}
