//! Assistant error types.
//!
//! Nothing in this taxonomy is fatal to a running session: every variant
//! degrades to a sentinel result at the component boundary.

use thiserror::Error;

use board_reader::ExtractError;
use chess_core::fen::FenError;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("invalid position: {0}")]
    InvalidPosition(#[from] FenError),

    #[error("advisory request failed: {0}")]
    Advisor(String),

    #[error("advisory request timed out")]
    Timeout,

    #[error("could not parse advisory response: {0}")]
    Parse(String),

    #[error("channel closed")]
    ChannelClosed,
}
