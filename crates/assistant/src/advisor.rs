//! Advisory service client.
//!
//! The service is opaque: descriptor plus context in, suggestion out. The
//! wire shape is a chat-completions payload whose reply content should be a
//! single JSON object, handled by the tolerant parser.

use std::future::Future;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use chess_core::fen::Color;

use crate::config::Config;
use crate::error::AssistantError;
use crate::parse::{parse_analysis, AnalysisResult};

const SYSTEM_INSTRUCTION: &str = "You are a chess analysis engine. Given a FEN position and game \
context, respond with exactly one JSON object and nothing else: \
{\"evaluation\": number, \"bestMove\": string, \"depth\": number, \
\"moveReasoning\": string, \"alternativeMoves\": [{\"move\": string, \
\"reasoning\": string, \"evaluation\": number}]}. Evaluate from White's \
perspective in pawns. Suggest moves for the side to move only.";

/// One analysis request, bundled with the context the scheduler derived.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub fen: String,
    pub side_to_move: Color,
    pub player_color: Color,
    pub history: Vec<String>,
    pub context: String,
}

/// Capability to obtain a suggestion for a position. Kept as a trait so the
/// scheduler and control router can run against a stub in tests.
pub trait Advisor: Send + Sync {
    fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> impl Future<Output = Result<AnalysisResult, AssistantError>> + Send;
}

/// HTTP advisor speaking the chat-completions wire format.
pub struct HttpAdvisor {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl HttpAdvisor {
    pub fn new(config: &Config) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("ChessAssistant/1.0")
            .timeout(config.analysis_timeout)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            url: config.advisor_url.clone(),
            api_key: config.advisor_api_key.clone(),
            model: config.advisor_model.clone(),
        }
    }

    fn user_message(request: &AnalysisRequest) -> String {
        format!(
            "Position (FEN): {}\nSide to move: {}\nI am playing: {}\n\n{}",
            request.fen, request.side_to_move, request.player_color, request.context
        )
    }
}

impl Advisor for HttpAdvisor {
    fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> impl Future<Output = Result<AnalysisResult, AssistantError>> + Send {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_INSTRUCTION },
                { "role": "user", "content": Self::user_message(request) },
            ],
        });

        async move {
            let mut req = self.client.post(&self.url).json(&body);
            if !self.api_key.is_empty() {
                req = req.bearer_auth(&self.api_key);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| AssistantError::Advisor(format!("request error: {e}")))?;

            if !resp.status().is_success() {
                return Err(AssistantError::Advisor(format!("HTTP {}", resp.status())));
            }

            let payload: Value = resp
                .json()
                .await
                .map_err(|e| AssistantError::Advisor(format!("body read error: {e}")))?;

            let content = payload["choices"][0]["message"]["content"]
                .as_str()
                .ok_or_else(|| {
                    AssistantError::Advisor("response missing message content".to_string())
                })?;

            debug!(len = content.len(), "advisory response content received");
            Ok(parse_analysis(content))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_carries_descriptor_and_context() {
        let request = AnalysisRequest {
            fen: "4k3/8/8/8/8/8/8/4K3 w - - 0 1".to_string(),
            side_to_move: Color::White,
            player_color: Color::Black,
            history: vec![],
            context: "Estimated game phase: endgame".to_string(),
        };
        let message = HttpAdvisor::user_message(&request);
        assert!(message.contains("Position (FEN): 4k3/8/8/8/8/8/8/4K3 w - - 0 1"));
        assert!(message.contains("Side to move: white"));
        assert!(message.contains("I am playing: black"));
        assert!(message.contains("endgame"));
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = AnalysisRequest {
            fen: "fen".to_string(),
            side_to_move: Color::White,
            player_color: Color::White,
            history: vec!["a".to_string()],
            context: String::new(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"sideToMove\":\"white\""));
        assert!(json.contains("\"playerColor\""));
    }
}
