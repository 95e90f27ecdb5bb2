//! Job identifiers and input validation.

use crate::error::{Result, SzinkronError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

/// Opaque, URL-safe job identifier.
///
/// The identifier doubles as the per-job directory name, so parsing rejects
/// anything that could traverse outside the artifact root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh id (32 lowercase hex characters).
    pub fn generate() -> Self {
        JobId(Uuid::new_v4().simple().to_string())
    }

    /// Parse an id received from a caller.
    pub fn parse(raw: &str) -> Result<Self> {
        static ID_RE: OnceLock<Regex> = OnceLock::new();
        let re = ID_RE.get_or_init(|| Regex::new(r"^[a-z0-9]{22,64}$").expect("Invalid regex"));

        if re.is_match(raw) {
            Ok(JobId(raw.to_string()))
        } else {
            Err(SzinkronError::NotFound(format!("Invalid job id: {}", raw)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check that a URL points at a supported video host.
pub fn is_valid_video_url(url: &str) -> bool {
    static URL_RE: OnceLock<Regex> = OnceLock::new();
    let re = URL_RE.get_or_init(|| {
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/)")
            .expect("Invalid regex")
    });
    !url.is_empty() && re.is_match(url)
}

/// Extract the video id from a supported URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    static VID_RE: OnceLock<Regex> = OnceLock::new();
    let re = VID_RE.get_or_init(|| {
        Regex::new(
            r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/)([a-zA-Z0-9_-]{11})",
        )
        .expect("Invalid regex")
    });
    re.captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Canonical watch URL for a video id.
pub fn canonical_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_parseable_and_long_enough() {
        let id = JobId::generate();
        assert!(id.as_str().len() >= 22);
        assert_eq!(JobId::parse(id.as_str()).unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_traversal() {
        assert!(JobId::parse("../../etc/passwd").is_err());
        assert!(JobId::parse("abc").is_err());
        assert!(JobId::parse("ABCDEF0123456789ABCDEF0123").is_err());
    }

    #[test]
    fn test_url_validation() {
        assert!(is_valid_video_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_valid_video_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(!is_valid_video_url("https://example.com/video"));
        assert!(!is_valid_video_url(""));
    }

    #[test]
    fn test_extract_video_id() {
        assert_eq!(
            extract_video_id("https://youtube.com/watch?v=dQw4w9WgXcQ&t=10"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(extract_video_id("not a url"), None);
    }

    #[test]
    fn test_canonical_url() {
        assert_eq!(
            canonical_url("dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }
}
