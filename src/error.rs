//! Error types for Szinkron.

use thiserror::Error;

/// Library-level error type for Szinkron operations.
#[derive(Error, Debug)]
pub enum SzinkronError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Artifact not ready: {0}")]
    ArtifactNotReady(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Voice '{voice_id}' not found on provider '{provider}'")]
    VoiceNotFound { provider: String, voice_id: String },

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    #[error("Transient remote error: {0}")]
    TransientRemote(String),

    #[error("Projected cost ${projected:.4} exceeds budget ${limit:.4}")]
    BudgetExceeded { projected: f64, limit: f64 },

    #[error("Audio format rejected by recognizer: {0}")]
    AudioFormatRejected(String),

    #[error("Input too large: {0}")]
    InputTooLarge(String),

    #[error("Muxer failed (exit {exit_code}): {stderr_tail}")]
    MuxerFailed { exit_code: i32, stderr_tail: String },

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SzinkronError {
    /// Stable error-kind tag exposed in job records and HTTP payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            SzinkronError::Config(_) | SzinkronError::TomlParse(_) => "config",
            SzinkronError::InvalidRequest(_) => "invalid_request",
            SzinkronError::NotFound(_) => "not_found",
            SzinkronError::ArtifactNotReady(_) => "artifact_not_ready",
            SzinkronError::UnsupportedLanguage(_) => "unsupported_language",
            SzinkronError::VoiceNotFound { .. } => "voice_not_found",
            SzinkronError::SourceUnavailable(_) => "source_unavailable",
            SzinkronError::QuotaExceeded(_) => "quota_exceeded",
            SzinkronError::TransientNetwork(_) | SzinkronError::Http(_) => "transient_network",
            SzinkronError::TransientRemote(_) => "transient_remote",
            SzinkronError::BudgetExceeded { .. } => "budget_exceeded",
            SzinkronError::AudioFormatRejected(_) => "audio_format_rejected",
            SzinkronError::InputTooLarge(_) => "input_too_large",
            SzinkronError::MuxerFailed { .. } => "muxer_failed",
            SzinkronError::Cancelled => "cancelled",
            SzinkronError::Io(_) => "io",
            SzinkronError::Json(_) => "json",
            SzinkronError::ToolNotFound(_) => "tool_not_found",
            SzinkronError::ToolFailed(_) => "tool_failed",
            SzinkronError::Internal(_) => "internal",
        }
    }

    /// Whether the failing stage may retry after this error.
    ///
    /// QuotaExceeded is retryable at the recognizer (bounded backoff) but
    /// surfaced immediately by TTS providers; callers that must not thrash
    /// check for it explicitly.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SzinkronError::TransientNetwork(_)
                | SzinkronError::TransientRemote(_)
                | SzinkronError::Http(_)
        )
    }
}

/// Result type alias for Szinkron operations.
pub type Result<T> = std::result::Result<T, SzinkronError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(
            SzinkronError::InvalidRequest("x".into()).kind(),
            "invalid_request"
        );
        assert_eq!(
            SzinkronError::VoiceNotFound {
                provider: "p".into(),
                voice_id: "v".into()
            }
            .kind(),
            "voice_not_found"
        );
        assert_eq!(
            SzinkronError::BudgetExceeded {
                projected: 1.0,
                limit: 0.5
            }
            .kind(),
            "budget_exceeded"
        );
        assert_eq!(SzinkronError::Cancelled.kind(), "cancelled");
    }

    #[test]
    fn test_transience() {
        assert!(SzinkronError::TransientRemote("x".into()).is_transient());
        assert!(SzinkronError::TransientNetwork("x".into()).is_transient());
        assert!(!SzinkronError::InvalidRequest("x".into()).is_transient());
        assert!(!SzinkronError::Cancelled.is_transient());
        assert!(!SzinkronError::QuotaExceeded("x".into()).is_transient());
    }
}
