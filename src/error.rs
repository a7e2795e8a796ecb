//! Error types for skill execution.
//!
//! Errors are classified by recoverability:
//! - Retryable: network issues, timeouts, rate limits
//! - NonRetryable: configuration errors, bad responses, auth problems
//!
//! Provider failures never abort a briefing; the orchestration converts
//! them into `errors_encountered` entries and returns partial results.

use thiserror::Error;

/// Error type shared by all skills and provider clients.
#[derive(Debug, Error)]
pub enum SkillError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Authentication missing or expired: {0}")]
    AuthMissing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

impl SkillError {
    /// Returns true if retrying the operation could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SkillError::Http(e) => e.is_timeout() || e.is_connect(),
            SkillError::Api { status, .. } => *status == 429 || *status == 408 || *status >= 500,
            _ => false,
        }
    }

    /// Stable machine-readable code, mirrored into briefing error entries.
    pub fn code(&self) -> &'static str {
        match self {
            SkillError::Http(_) => "HTTP_ERROR",
            SkillError::Api { .. } => "API_ERROR",
            SkillError::AuthMissing(_) => "AUTH_MISSING",
            SkillError::Config(_) => "CONFIG_ERROR",
            SkillError::Parse(_) => "PARSE_ERROR",
            SkillError::Json(_) => "JSON_ERROR",
            SkillError::Io(_) => "IO_ERROR",
        }
    }
}
