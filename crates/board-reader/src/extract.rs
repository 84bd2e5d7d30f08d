//! Position extraction: one board snapshot in, one position descriptor out.

use thiserror::Error;
use tracing::{debug, warn};

use chess_core::fen::{CastlingRights, Color, Fen, Piece, PieceKind, Placement};

use crate::snapshot::BoardSnapshot;

/// Below this many rendered pieces the board is assumed mid-render; most
/// openings keep at least this many on the board.
pub const MIN_PIECE_SPRITES: usize = 20;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("board region not found")]
    BoardMissing,

    #[error("only {found} piece elements found, board likely not fully rendered")]
    TooFewPieces { found: usize },

    #[error("invalid board geometry: width {width}px")]
    BadGeometry { width: f64 },
}

/// Reconstruct a position descriptor from a snapshot of the rendered board.
///
/// Castling rights are approximated from king/rook home-square occupancy and
/// the en-passant target is always absent; neither is authoritative without
/// true move history. The fullmove number is estimated from the number of
/// pieces no longer on the board.
pub fn extract_position(snapshot: &BoardSnapshot) -> Result<Fen, ExtractError> {
    let square_size = snapshot.board_width / 8.0;
    if !(square_size > 0.0) {
        return Err(ExtractError::BadGeometry {
            width: snapshot.board_width,
        });
    }

    if snapshot.pieces.len() < MIN_PIECE_SPRITES {
        return Err(ExtractError::TooFewPieces {
            found: snapshot.pieces.len(),
        });
    }

    let mut placement = Placement::empty();
    for sprite in &snapshot.pieces {
        let Some(piece) = piece_from_hint(&sprite.class_hint) else {
            warn!(hint = %sprite.class_hint, "could not determine piece from class hint");
            continue;
        };

        let file = (sprite.x / square_size).floor() as i64;
        let rank = (sprite.y / square_size).floor() as i64;
        if !(0..8).contains(&file) || !(0..8).contains(&rank) {
            warn!(file, rank, "piece coordinates out of bounds, skipping");
            continue;
        }

        placement.set(file as usize, rank as usize, Some(piece));
    }

    let side_to_move = side_to_move(snapshot);
    let castling = approximate_castling(&placement);

    let occupied = placement.occupied_count();
    let fullmove_number = 1 + (32usize.saturating_sub(occupied) / 2) as u32;

    debug!(
        occupied,
        side = %side_to_move,
        "extracted position from snapshot"
    );

    Ok(Fen {
        placement,
        side_to_move,
        castling,
        en_passant: None,
        halfmove_clock: 0,
        fullmove_number,
    })
}

fn piece_from_hint(hint: &str) -> Option<Piece> {
    let hint = hint.to_ascii_lowercase();

    let color = if hint.contains("white") {
        Color::White
    } else if hint.contains("black") {
        Color::Black
    } else {
        return None;
    };

    let kind = if hint.contains("pawn") {
        PieceKind::Pawn
    } else if hint.contains("knight") {
        PieceKind::Knight
    } else if hint.contains("bishop") {
        PieceKind::Bishop
    } else if hint.contains("rook") {
        PieceKind::Rook
    } else if hint.contains("queen") {
        PieceKind::Queen
    } else if hint.contains("king") {
        PieceKind::King
    } else {
        return None;
    };

    Some(Piece::new(color, kind))
}

/// Side to move from a textual hint when the page shows one, otherwise from
/// move-indicator parity (even count → white to move). The parity signal is
/// a known weak point when the indicator lags the animation.
fn side_to_move(snapshot: &BoardSnapshot) -> Color {
    if let Some(hint) = &snapshot.turn_hint {
        let hint = hint.to_ascii_lowercase();
        if hint.contains("white") {
            return Color::White;
        }
        if hint.contains("black") {
            return Color::Black;
        }
    }

    if snapshot.move_count % 2 == 0 {
        Color::White
    } else {
        Color::Black
    }
}

/// Castling is assumed available while king and rook still sit on their home
/// squares. Not authoritative: a king that moved and returned re-enables the
/// flag.
fn approximate_castling(placement: &Placement) -> CastlingRights {
    let white_king = placement.get(4, 7) == Some(Piece::new(Color::White, PieceKind::King));
    let black_king = placement.get(4, 0) == Some(Piece::new(Color::Black, PieceKind::King));

    CastlingRights {
        white_kingside: white_king
            && placement.get(7, 7) == Some(Piece::new(Color::White, PieceKind::Rook)),
        white_queenside: white_king
            && placement.get(0, 7) == Some(Piece::new(Color::White, PieceKind::Rook)),
        black_kingside: black_king
            && placement.get(7, 0) == Some(Piece::new(Color::Black, PieceKind::Rook)),
        black_queenside: black_king
            && placement.get(0, 0) == Some(Piece::new(Color::Black, PieceKind::Rook)),
    }
}
