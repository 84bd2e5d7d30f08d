//! Board reading pipeline: snapshot model, position extraction, stability
//! detection, color detection, and change observation.
//!
//! Everything that touches rendered-page geometry lives behind the
//! [`snapshot::BoardReader`] trait so the extraction and settling logic can
//! be exercised against synthetic geometry.

pub mod color;
pub mod extract;
pub mod observer;
pub mod snapshot;
pub mod stability;

pub use extract::{extract_position, ExtractError};
pub use observer::{BoardMutation, ChangeObserver};
pub use snapshot::{BoardReader, BoardSnapshot, PieceSprite};
pub use stability::{Poll, StabilityDetector};
