//! Game-phase estimation and pawn-structure analysis.
//!
//! Both feed the free-form context text bundled with advisory requests.

use std::collections::BTreeMap;
use std::fmt;

use crate::fen::{Color, PieceKind, Placement};

/// Rough phase estimate from the number of occupied squares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Opening,
    Middlegame,
    Endgame,
}

impl GamePhase {
    pub fn estimate(placement: &Placement) -> Self {
        match placement.occupied_count() {
            n if n > 24 => GamePhase::Opening,
            n if n > 10 => GamePhase::Middlegame,
            _ => GamePhase::Endgame,
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GamePhase::Opening => write!(f, "opening"),
            GamePhase::Middlegame => write!(f, "middlegame"),
            GamePhase::Endgame => write!(f, "endgame"),
        }
    }
}

/// File letter ('a'..='h') of every pawn of the given color, one entry per
/// pawn, unsorted.
pub fn pawn_files(placement: &Placement, color: Color) -> Vec<char> {
    placement
        .pieces()
        .filter(|(_, _, p)| p.kind == PieceKind::Pawn && p.color == color)
        .map(|(file, _, _)| (b'a' + file as u8) as char)
        .collect()
}

/// Files holding two or more pawns of the same color.
pub fn doubled_files(pawn_files: &[char]) -> Vec<char> {
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    for &file in pawn_files {
        *counts.entry(file).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(file, _)| file)
        .collect()
}

/// Files whose pawns have no friendly pawn on either adjacent file.
pub fn isolated_files(pawn_files: &[char]) -> Vec<char> {
    let unique: Vec<char> = {
        let mut files = pawn_files.to_vec();
        files.sort_unstable();
        files.dedup();
        files
    };

    unique
        .iter()
        .copied()
        .filter(|&file| {
            let prev = (file as u8 - 1) as char;
            let next = (file as u8 + 1) as char;
            let has_prev = file > 'a' && unique.contains(&prev);
            let has_next = file < 'h' && unique.contains(&next);
            !has_prev && !has_next
        })
        .collect()
}

fn join_files(files: &[char]) -> String {
    files
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Human-readable pawn structure report for the advisory context.
pub fn pawn_structure_summary(placement: &Placement) -> String {
    let white_files = pawn_files(placement, Color::White);
    let black_files = pawn_files(placement, Color::Black);

    let white_doubled = doubled_files(&white_files);
    let black_doubled = doubled_files(&black_files);
    let white_isolated = isolated_files(&white_files);
    let black_isolated = isolated_files(&black_files);

    let mut summary = String::from("Pawn structure analysis:");
    let mut has_features = false;

    if !white_doubled.is_empty() {
        summary.push_str(&format!(
            "\n- White has doubled pawns on files: {}",
            join_files(&white_doubled)
        ));
        has_features = true;
    }
    if !black_doubled.is_empty() {
        summary.push_str(&format!(
            "\n- Black has doubled pawns on files: {}",
            join_files(&black_doubled)
        ));
        has_features = true;
    }
    if !white_isolated.is_empty() {
        summary.push_str(&format!(
            "\n- White has isolated pawns on files: {}",
            join_files(&white_isolated)
        ));
        has_features = true;
    }
    if !black_isolated.is_empty() {
        summary.push_str(&format!(
            "\n- Black has isolated pawns on files: {}",
            join_files(&black_isolated)
        ));
        has_features = true;
    }

    if !has_features {
        let mut white_sorted = white_files.clone();
        white_sorted.sort_unstable();
        white_sorted.dedup();
        let mut black_sorted = black_files.clone();
        black_sorted.sort_unstable();
        black_sorted.dedup();

        summary.push_str("\n- Standard pawn structure with no doubled or isolated pawns");
        summary.push_str(&format!(
            "\n- White pawns on files: {}",
            if white_sorted.is_empty() {
                "none".to_string()
            } else {
                join_files(&white_sorted)
            }
        ));
        summary.push_str(&format!(
            "\n- Black pawns on files: {}",
            if black_sorted.is_empty() {
                "none".to_string()
            } else {
                join_files(&black_sorted)
            }
        ));
    }

    summary
}
