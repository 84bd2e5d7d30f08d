//! Position descriptor — FEN parsing, serialization, and structural validation.
//!
//! Positions reconstructed from a rendered board are untrustworthy until they
//! pass the checks here, so parsing is strict: every field is validated and
//! violations come back as typed errors rather than panics.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    #[error("empty FEN string")]
    Empty,

    #[error("FEN must have 6 fields, found {0}")]
    FieldCount(usize),

    #[error("board must have 8 ranks, found {0}")]
    RankCount(usize),

    #[error("invalid character in rank: {0}")]
    InvalidChar(char),

    #[error("rank has {0} squares instead of 8")]
    RankWidth(usize),

    #[error("expected exactly one {color} king, found {found}")]
    KingCount { color: Color, found: usize },

    #[error("implausible piece count: {0}")]
    PieceCount(usize),

    #[error("turn must be 'w' or 'b', found {0:?}")]
    InvalidTurn(String),

    #[error("invalid castling rights: {0:?}")]
    InvalidCastling(String),

    #[error("invalid en passant square: {0:?}")]
    InvalidEnPassant(String),

    #[error("invalid move clock: {0:?}")]
    InvalidClock(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    pub fn fen_token(self) -> &'static str {
        match self {
            Color::White => "w",
            Color::Black => "b",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    /// Lowercase FEN letter for this piece type.
    pub fn letter(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    /// FEN character: uppercase for white, lowercase for black.
    pub fn fen_char(self) -> char {
        let c = self.kind.letter();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    pub fn from_fen_char(c: char) -> Option<Self> {
        let kind = match c.to_ascii_lowercase() {
            'p' => PieceKind::Pawn,
            'n' => PieceKind::Knight,
            'b' => PieceKind::Bishop,
            'r' => PieceKind::Rook,
            'q' => PieceKind::Queen,
            'k' => PieceKind::King,
            _ => return None,
        };
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Self { color, kind })
    }
}

/// 8x8 piece placement. Rank index 0 is the top of the board as rendered
/// (rank 8 in chess terms, matching FEN field order); file index 0 is the
/// a-file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    squares: [[Option<Piece>; 8]; 8],
}

impl Placement {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, file: usize, rank: usize) -> Option<Piece> {
        self.squares[rank][file]
    }

    pub fn set(&mut self, file: usize, rank: usize, piece: Option<Piece>) {
        self.squares[rank][file] = piece;
    }

    /// Iterate occupied squares as (file, rank, piece).
    pub fn pieces(&self) -> impl Iterator<Item = (usize, usize, Piece)> + '_ {
        self.squares.iter().enumerate().flat_map(|(rank, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(file, sq)| sq.map(|p| (file, rank, p)))
        })
    }

    pub fn occupied_count(&self) -> usize {
        self.pieces().count()
    }

    pub fn king_count(&self, color: Color) -> usize {
        self.pieces()
            .filter(|(_, _, p)| p.kind == PieceKind::King && p.color == color)
            .count()
    }

    /// Serialize as the FEN board field with run-length-encoded empties.
    pub fn to_fen_field(&self) -> String {
        let mut out = String::new();
        for (rank, row) in self.squares.iter().enumerate() {
            let mut empty = 0u8;
            for sq in row {
                match sq {
                    Some(piece) => {
                        if empty > 0 {
                            out.push((b'0' + empty) as char);
                            empty = 0;
                        }
                        out.push(piece.fen_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push((b'0' + empty) as char);
            }
            if rank < 7 {
                out.push('/');
            }
        }
        out
    }

    /// Parse a FEN board field, checking rank count and rank widths.
    pub fn from_fen_field(field: &str) -> Result<Self, FenError> {
        let ranks: Vec<&str> = field.split('/').collect();
        if ranks.len() != 8 {
            return Err(FenError::RankCount(ranks.len()));
        }

        let mut placement = Placement::empty();
        for (rank_idx, rank) in ranks.iter().enumerate() {
            let mut file = 0usize;
            for c in rank.chars() {
                if let Some(d) = c.to_digit(10) {
                    if d == 0 || d > 8 {
                        return Err(FenError::InvalidChar(c));
                    }
                    file += d as usize;
                } else if let Some(piece) = Piece::from_fen_char(c) {
                    if file >= 8 {
                        return Err(FenError::RankWidth(file + 1));
                    }
                    placement.set(file, rank_idx, Some(piece));
                    file += 1;
                } else {
                    return Err(FenError::InvalidChar(c));
                }
            }
            if file != 8 {
                return Err(FenError::RankWidth(file));
            }
        }
        Ok(placement)
    }
}

/// Castling availability flags, one per side and wing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastlingRights {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn to_fen_field(self) -> String {
        let mut out = String::new();
        if self.white_kingside {
            out.push('K');
        }
        if self.white_queenside {
            out.push('Q');
        }
        if self.black_kingside {
            out.push('k');
        }
        if self.black_queenside {
            out.push('q');
        }
        if out.is_empty() {
            out.push('-');
        }
        out
    }

    pub fn from_fen_field(field: &str) -> Result<Self, FenError> {
        if field == "-" {
            return Ok(Self::none());
        }
        if field.is_empty() {
            return Err(FenError::InvalidCastling(field.to_string()));
        }
        let mut rights = Self::none();
        for c in field.chars() {
            match c {
                'K' => rights.white_kingside = true,
                'Q' => rights.white_queenside = true,
                'k' => rights.black_kingside = true,
                'q' => rights.black_queenside = true,
                _ => return Err(FenError::InvalidCastling(field.to_string())),
            }
        }
        Ok(rights)
    }
}

/// Board square, file 0 = a-file, rank 0 = rank 8 (FEN order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Square {
    pub file: usize,
    pub rank: usize,
}

impl Square {
    /// Parse algebraic notation like "e3".
    pub fn from_algebraic(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let file_c = chars.next()?;
        let rank_c = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        if !('a'..='h').contains(&file_c) {
            return None;
        }
        let rank_digit = rank_c.to_digit(10)?;
        if !(1..=8).contains(&rank_digit) {
            return None;
        }
        Some(Square {
            file: (file_c as u8 - b'a') as usize,
            rank: 8 - rank_digit as usize,
        })
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file as u8) as char, 8 - self.rank)
    }
}

/// A full position descriptor: placement, side to move, castling rights,
/// en passant target, and move clocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fen {
    pub placement: Placement,
    pub side_to_move: Color,
    pub castling: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

impl Fen {
    /// Dedup key for the scheduler: placement and side to move only, so the
    /// same position is not re-analyzed just because a clock field drifted.
    pub fn board_turn_key(&self) -> String {
        format!(
            "{} {}",
            self.placement.to_fen_field(),
            self.side_to_move.fen_token()
        )
    }

    /// Structural validation beyond field syntax: exactly one king per color
    /// and a believable piece count. Descriptors built directly from board
    /// geometry have not been through `FromStr` and must pass here before
    /// they are trusted.
    pub fn validate(&self) -> Result<(), FenError> {
        for color in [Color::White, Color::Black] {
            let found = self.placement.king_count(color);
            if found != 1 {
                return Err(FenError::KingCount { color, found });
            }
        }
        let count = self.placement.occupied_count();
        if !(2..=32).contains(&count) {
            return Err(FenError::PieceCount(count));
        }
        Ok(())
    }
}

impl fmt::Display for Fen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.placement.to_fen_field(),
            self.side_to_move.fen_token(),
            self.castling.to_fen_field(),
            self.en_passant
                .map(|sq| sq.to_string())
                .unwrap_or_else(|| "-".to_string()),
            self.halfmove_clock,
            self.fullmove_number,
        )
    }
}

impl FromStr for Fen {
    type Err = FenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(FenError::Empty);
        }

        let fields: Vec<&str> = s.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(FenError::FieldCount(fields.len()));
        }

        let placement = Placement::from_fen_field(fields[0])?;

        let side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => return Err(FenError::InvalidTurn(other.to_string())),
        };

        let castling = CastlingRights::from_fen_field(fields[2])?;

        let en_passant = match fields[3] {
            "-" => None,
            sq => {
                let square = Square::from_algebraic(sq)
                    .ok_or_else(|| FenError::InvalidEnPassant(sq.to_string()))?;
                // Only the two capture ranks are legal targets
                if square.rank != 2 && square.rank != 5 {
                    return Err(FenError::InvalidEnPassant(sq.to_string()));
                }
                Some(square)
            }
        };

        let halfmove_clock: u32 = fields[4]
            .parse()
            .map_err(|_| FenError::InvalidClock(fields[4].to_string()))?;
        let fullmove_number: u32 = fields[5]
            .parse()
            .map_err(|_| FenError::InvalidClock(fields[5].to_string()))?;

        let fen = Fen {
            placement,
            side_to_move,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        };
        fen.validate()?;
        Ok(fen)
    }
}

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_position_round_trip() {
        let fen: Fen = STANDARD_START_FEN.parse().unwrap();
        assert_eq!(fen.side_to_move, Color::White);
        assert!(fen.castling.white_kingside && fen.castling.black_queenside);
        assert_eq!(fen.placement.occupied_count(), 32);
        assert_eq!(fen.to_string(), STANDARD_START_FEN);
    }

    #[test]
    fn test_synthetic_placement_round_trip() {
        let mut placement = Placement::empty();
        placement.set(4, 7, Some(Piece::new(Color::White, PieceKind::King)));
        placement.set(4, 0, Some(Piece::new(Color::Black, PieceKind::King)));
        placement.set(0, 3, Some(Piece::new(Color::White, PieceKind::Rook)));
        placement.set(6, 5, Some(Piece::new(Color::Black, PieceKind::Pawn)));

        let fen = Fen {
            placement,
            side_to_move: Color::Black,
            castling: CastlingRights::none(),
            en_passant: None,
            halfmove_clock: 12,
            fullmove_number: 40,
        };
        let reparsed: Fen = fen.to_string().parse().unwrap();
        assert_eq!(reparsed, fen);
        assert_eq!(reparsed.placement.to_fen_field(), "4k3/8/8/R7/8/6p1/8/4K3");
    }

    #[test]
    fn test_rejects_wrong_field_count() {
        let err = "8/8/8/8/8/8/8/8 w -".parse::<Fen>().unwrap_err();
        assert_eq!(err, FenError::FieldCount(3));
    }

    #[test]
    fn test_rejects_short_rank() {
        let err = "4k3/8/8/8/8/8/7/4K3 w - - 0 1".parse::<Fen>().unwrap_err();
        assert_eq!(err, FenError::RankWidth(7));
    }

    #[test]
    fn test_rejects_wrong_king_count() {
        let err = "4k3/8/8/8/8/8/8/3KK3 w - - 0 1".parse::<Fen>().unwrap_err();
        assert_eq!(
            err,
            FenError::KingCount {
                color: Color::White,
                found: 2
            }
        );
    }

    #[test]
    fn test_rejects_bad_turn_and_castling() {
        assert!(matches!(
            "4k3/8/8/8/8/8/8/4K3 x - - 0 1".parse::<Fen>(),
            Err(FenError::InvalidTurn(_))
        ));
        assert!(matches!(
            "4k3/8/8/8/8/8/8/4K3 w KX - 0 1".parse::<Fen>(),
            Err(FenError::InvalidCastling(_))
        ));
    }

    #[test]
    fn test_rejects_bad_en_passant() {
        assert!(matches!(
            "4k3/8/8/8/8/8/8/4K3 w - e4 0 1".parse::<Fen>(),
            Err(FenError::InvalidEnPassant(_))
        ));
        let ok: Fen = "4k3/8/8/8/8/8/8/4K3 w - e3 0 1".parse().unwrap();
        assert_eq!(ok.en_passant.unwrap().to_string(), "e3");
    }

    #[test]
    fn test_board_turn_key_ignores_clocks() {
        let a: Fen = "4k3/8/8/8/8/8/8/4K3 w - - 0 1".parse().unwrap();
        let b: Fen = "4k3/8/8/8/8/8/8/4K3 w - - 30 61".parse().unwrap();
        assert_eq!(a.board_turn_key(), b.board_turn_key());
        assert_eq!(a.board_turn_key(), "4k3/8/8/8/8/8/8/4K3 w");
    }
}
