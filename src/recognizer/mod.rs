//! Speech recognition adapter.
//!
//! Presents a uniform interface over the remote recognizer, choosing between
//! a synchronous path for small inputs and a staged path (object-store
//! upload plus long-running operation polling) for large ones.

mod speech;

pub use speech::SpeechRecognizer;

use crate::error::Result;
use crate::jobs::CancelToken;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A recognized word with timing and confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizerHit {
    pub word: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    /// Confidence in [0, 1].
    pub confidence: f64,
}

/// Progress callback: sub-progress in [0, 100].
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// Trait for speech recognition services.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Transcribe an audio file into ordered word hits.
    async fn recognize(
        &self,
        audio_path: &Path,
        language: &str,
        duration_seconds: Option<f64>,
        progress: ProgressFn<'_>,
        cancel: &CancelToken,
    ) -> Result<Vec<RecognizerHit>>;
}

/// Whether the staged (upload + long-poll) path must be used.
///
/// Files at most `limit_mb` **and** at most `duration_limit_seconds` long
/// take the synchronous path; a file exactly at the size limit stays sync.
pub fn use_staged_path(
    size_bytes: u64,
    limit_mb: f64,
    duration_seconds: Option<f64>,
    duration_limit_seconds: u32,
) -> bool {
    let size_mb = size_bytes as f64 / (1024.0 * 1024.0);
    size_mb > limit_mb
        || duration_seconds.is_some_and(|d| d > duration_limit_seconds as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn test_exactly_at_size_limit_stays_sync() {
        assert!(!use_staged_path(10 * MB, 10.0, Some(30.0), 55));
    }

    #[test]
    fn test_over_size_limit_goes_staged() {
        assert!(use_staged_path(10 * MB + 1, 10.0, Some(30.0), 55));
    }

    #[test]
    fn test_long_duration_goes_staged() {
        assert!(use_staged_path(MB, 10.0, Some(56.0), 55));
        assert!(!use_staged_path(MB, 10.0, Some(55.0), 55));
    }

    #[test]
    fn test_unknown_duration_decides_by_size() {
        assert!(!use_staged_path(MB, 10.0, None, 55));
    }
}
