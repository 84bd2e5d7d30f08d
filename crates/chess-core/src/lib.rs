pub mod context;
pub mod fen;
pub mod plausibility;
pub mod structure;

pub use fen::{CastlingRights, Color, Fen, FenError, Piece, PieceKind, Placement, Square};
pub use structure::GamePhase;
