//! Local player color detection.
//!
//! The board is rendered from the local player's point of view, so the
//! vertical position of any white pawn gives the orientation away: white
//! pawns in the lower half mean the local player is White.

use std::time::Duration;

use tracing::{debug, info};

use chess_core::fen::Color;

use crate::snapshot::{BoardReader, BoardSnapshot};

/// Backoff between detection retries while the board is still rendering.
pub const COLOR_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Infer the local player's color from one snapshot, or `None` when no
/// white pawn is visible yet.
pub fn detect_color(snapshot: &BoardSnapshot) -> Option<Color> {
    let midpoint = snapshot.board_width / 2.0;

    let pawn = snapshot.pieces.iter().find(|sprite| {
        let hint = sprite.class_hint.to_ascii_lowercase();
        hint.contains("white") && hint.contains("pawn")
    })?;

    Some(if pawn.y > midpoint {
        Color::White
    } else {
        Color::Black
    })
}

/// Retry detection until it succeeds. The result is detected once per
/// session and never re-validated afterwards.
pub async fn ensure_color<R: BoardReader>(reader: &mut R) -> Color {
    loop {
        if let Some(color) = reader.snapshot().as_ref().and_then(detect_color) {
            info!(%color, "detected local player color");
            return color;
        }
        debug!("player color not yet detectable, retrying");
        tokio::time::sleep(COLOR_RETRY_DELAY).await;
    }
}
