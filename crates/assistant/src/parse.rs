//! Tolerant parsing of advisory responses.
//!
//! The service is asked for bare JSON but routinely wraps it in code fences
//! or surrounds it with commentary, and occasionally emits broken JSON.
//! Parsing therefore runs a fixed fallback chain: strict parse, fence/brace
//! stripping, regex field recovery, and finally a zero-confidence sentinel.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A secondary suggestion from the advisory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeMove {
    #[serde(rename = "move")]
    pub notation: String,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub evaluation: Option<f64>,
}

/// Final analysis surfaced to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub evaluation: f64,
    pub best_move: String,
    #[serde(default)]
    pub move_reasoning: Option<String>,
    pub depth: u32,
    #[serde(default)]
    pub alternative_moves: Vec<AlternativeMove>,
}

impl AnalysisResult {
    /// Sentinel for failed or unusable analyses.
    pub fn unavailable(reason: &str) -> Self {
        Self {
            evaluation: 0.0,
            best_move: "Analysis unavailable".to_string(),
            move_reasoning: Some(reason.to_string()),
            depth: 0,
            alternative_moves: Vec::new(),
        }
    }

    /// Sentinel for descriptors that failed structural validation.
    pub fn invalid_position(reason: &str) -> Self {
        Self {
            evaluation: 0.0,
            best_move: "Invalid position".to_string(),
            move_reasoning: Some(reason.to_string()),
            depth: 0,
            alternative_moves: Vec::new(),
        }
    }
}

/// Parse the advisory response content, falling back stage by stage. Never
/// fails: the worst case is the unavailable sentinel.
pub fn parse_analysis(content: &str) -> AnalysisResult {
    if let Ok(result) = serde_json::from_str::<AnalysisResult>(content) {
        return result;
    }

    if let Some(result) = parse_embedded_object(content) {
        debug!("advisory response parsed after fence stripping");
        return result;
    }

    if let Some(result) = recover_fields(content) {
        warn!("advisory response recovered via field extraction");
        return result;
    }

    warn!("advisory response unparseable, returning sentinel");
    AnalysisResult::unavailable("response could not be parsed")
}

/// Drop code-fence lines and parse the first-to-last-brace window, which
/// tolerates commentary before and after the object.
fn parse_embedded_object(content: &str) -> Option<AnalysisResult> {
    let without_fences: String = content
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n");

    let start = without_fences.find('{')?;
    let end = without_fences.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&without_fences[start..=end]).ok()
}

/// Pull individual fields out of broken JSON. `bestMove` is the one field
/// worth salvaging; everything else degrades to defaults.
fn recover_fields(content: &str) -> Option<AnalysisResult> {
    let best_move_re = Regex::new(r#""bestMove"\s*:\s*"([^"]+)""#).ok()?;
    let best_move = best_move_re.captures(content)?.get(1)?.as_str().to_string();

    let evaluation = Regex::new(r#""evaluation"\s*:\s*(-?\d+(?:\.\d+)?)"#)
        .ok()
        .and_then(|re| re.captures(content))
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0);

    let depth = Regex::new(r#""depth"\s*:\s*(\d+)"#)
        .ok()
        .and_then(|re| re.captures(content))
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0);

    let move_reasoning = Regex::new(r#""moveReasoning"\s*:\s*"([^"]*)""#)
        .ok()
        .and_then(|re| re.captures(content))
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string());

    Some(AnalysisResult {
        evaluation,
        best_move,
        move_reasoning,
        depth,
        alternative_moves: Vec::new(),
    })
}
