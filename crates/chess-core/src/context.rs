//! Free-form context text bundled with each advisory request: game
//! progression, estimated phase, and pawn structure.

use crate::fen::Fen;
use crate::structure::{pawn_structure_summary, GamePhase};

/// Build the advisory context from the current position and the history
/// slice (serialized descriptors, oldest first).
pub fn advisory_context(fen: &Fen, history: &[String]) -> String {
    let mut context = String::from("Game progression:\n");
    for (i, entry) in history.iter().enumerate() {
        context.push_str(&format!("{}. {}\n", i + 1, entry));
    }

    context.push_str(&format!(
        "\nEstimated game phase: {}",
        GamePhase::estimate(&fen.placement)
    ));
    context.push('\n');
    context.push_str(&pawn_structure_summary(&fen.placement));
    context
}
