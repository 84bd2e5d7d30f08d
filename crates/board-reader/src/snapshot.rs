//! Snapshot of the rendered board region.
//!
//! A browser-side shim observes the page and ships these as plain data; on
//! this side nothing knows about a DOM. Pieces carry the raw class hint and
//! translate offsets exactly as rendered.

use serde::{Deserialize, Serialize};

/// One rendered piece element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceSprite {
    /// Style/class hint, e.g. "white pawn" or "black knight".
    pub class_hint: String,
    /// Horizontal translate offset in pixels from the board's left edge.
    pub x: f64,
    /// Vertical translate offset in pixels from the board's top edge.
    pub y: f64,
}

/// One reading of the board region and its auxiliary indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    /// Rendered width of the board's bounding box in pixels. The board is
    /// square, so this also fixes the height.
    pub board_width: f64,
    pub pieces: Vec<PieceSprite>,
    /// Number of move-notation indicator elements currently on the page.
    #[serde(default)]
    pub move_count: usize,
    /// Textual turn hint when the page shows one ("White to play", ...).
    #[serde(default)]
    pub turn_hint: Option<String>,
}

/// Capability to read the current board region. Returns `None` when the
/// board region is absent from the page.
pub trait BoardReader {
    fn snapshot(&mut self) -> Option<BoardSnapshot>;
}
