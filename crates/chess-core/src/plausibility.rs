//! Plausibility check for suggested moves.
//!
//! Deliberately approximate: only bishop-shaped SAN is verified (diagonal
//! reachability with a clear path), because diagonal suggestions are the ones
//! the advisory service most often hallucinates. Every other move shape is
//! accepted unchecked.

use crate::fen::{Fen, Piece, PieceKind, Square};

/// Returns true when the suggested move is worth surfacing.
///
/// Rejections never become errors upstream; the caller substitutes a fixed
/// fallback suggestion instead.
pub fn is_plausible(fen: &Fen, notation: &str) -> bool {
    let notation = notation.trim().trim_end_matches(['+', '#']);

    let Some(rest) = notation.strip_prefix('B') else {
        // Not a bishop move; accepted unchecked.
        return true;
    };

    let is_capture = rest.contains('x');
    // Arbitrary model text may hold multibyte characters; slice by char
    let chars: Vec<char> = rest.chars().collect();
    let dest_str: String = chars[chars.len().saturating_sub(2)..].iter().collect();
    let Some(dest) = Square::from_algebraic(&dest_str) else {
        // Bishop notation without a readable destination is not trustworthy.
        return false;
    };

    let bishop = Piece::new(fen.side_to_move, PieceKind::Bishop);
    let bishops: Vec<(usize, usize)> = fen
        .placement
        .pieces()
        .filter(|&(_, _, p)| p == bishop)
        .map(|(file, rank, _)| (file, rank))
        .collect();

    bishops
        .iter()
        .any(|&(file, rank)| can_slide_diagonally(fen, file, rank, dest, is_capture))
}

fn can_slide_diagonally(
    fen: &Fen,
    from_file: usize,
    from_rank: usize,
    dest: Square,
    is_capture: bool,
) -> bool {
    let df = dest.file as i32 - from_file as i32;
    let dr = dest.rank as i32 - from_rank as i32;
    if df.abs() != dr.abs() || df == 0 {
        return false;
    }

    let file_step = df.signum();
    let rank_step = dr.signum();

    // Walk the intermediate squares; any occupant blocks the slide.
    let mut file = from_file as i32 + file_step;
    let mut rank = from_rank as i32 + rank_step;
    while (file, rank) != (dest.file as i32, dest.rank as i32) {
        if fen.placement.get(file as usize, rank as usize).is_some() {
            return false;
        }
        file += file_step;
        rank += rank_step;
    }

    match fen.placement.get(dest.file, dest.rank) {
        None => !is_capture,
        Some(occupant) => is_capture && occupant.color == fen.side_to_move.opposite(),
    }
}
