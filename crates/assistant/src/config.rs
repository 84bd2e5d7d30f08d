//! Assistant configuration from environment variables.

use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    /// Chat-completions endpoint of the advisory service.
    pub advisor_url: String,
    /// Bearer token for the advisory service (empty for local endpoints).
    pub advisor_api_key: String,
    /// Model name sent with each request.
    pub advisor_model: String,
    /// Minimum interval between dispatched analyses.
    pub analysis_cooldown: Duration,
    /// Hard cap on one advisory round trip.
    pub analysis_timeout: Duration,
    /// Snapshot feed path, "-" for stdin.
    pub snapshot_feed: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            advisor_url: env::var("ADVISOR_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            advisor_api_key: env::var("ADVISOR_API_KEY").unwrap_or_default(),
            advisor_model: env::var("ADVISOR_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            analysis_cooldown: Duration::from_millis(
                env::var("ANALYSIS_COOLDOWN_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2000),
            ),
            analysis_timeout: Duration::from_secs(
                env::var("ANALYSIS_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(25),
            ),
            snapshot_feed: env::var("SNAPSHOT_FEED").unwrap_or_else(|_| "-".to_string()),
        }
    }
}
