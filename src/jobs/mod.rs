//! Job model and registry.

mod ledger;
mod registry;

pub use ledger::{CostLedger, CostLine, LineKind, ProgressPlan, Stage};
pub use registry::JobRegistry;

use crate::config::TranslationContext;
use crate::ids::JobId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What a job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Transcribe,
    Translate,
    Synthesize,
    Dub,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Transcribe => write!(f, "transcribe"),
            JobKind::Translate => write!(f, "translate"),
            JobKind::Synthesize => write!(f, "synthesize"),
            JobKind::Dub => write!(f, "dub"),
        }
    }
}

/// Job lifecycle states. Terminal states are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Whether the state machine permits `self -> next`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Queued, JobStatus::Running) => true,
            (JobStatus::Running, JobStatus::Completed) => true,
            (JobStatus::Running, JobStatus::Failed) => true,
            (JobStatus::Queued | JobStatus::Running, JobStatus::Cancelled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Structured error recorded on a failed job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobError {
    pub kind: String,
    pub stage: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_detail: Option<String>,
}

/// Synthesis audio quality requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    Low,
    Medium,
    #[default]
    High,
}

impl std::str::FromStr for AudioQuality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(AudioQuality::Low),
            "medium" => Ok(AudioQuality::Medium),
            "high" => Ok(AudioQuality::High),
            _ => Err(format!("Unknown audio quality: {}", s)),
        }
    }
}

/// Post-editing options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PostEditOptions {
    pub enabled: bool,
    /// Model id or "auto".
    pub model: Option<String>,
}

/// Translation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationOptions {
    pub enabled: bool,
    pub target_language: String,
    pub context: TranslationContext,
    pub audience: String,
    pub tone: String,
    /// fast | balanced | high
    pub quality: String,
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            target_language: "en-US".to_string(),
            context: TranslationContext::default(),
            audience: "general public".to_string(),
            tone: "neutral".to_string(),
            quality: "balanced".to_string(),
        }
    }
}

/// Synthesis options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisOptions {
    pub enabled: bool,
    /// Provider id or "auto".
    pub provider: String,
    pub voice_id: Option<String>,
    pub quality: AudioQuality,
    /// Output audio container extension.
    pub format: String,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "auto".to_string(),
            voice_id: None,
            quality: AudioQuality::High,
            format: "mp3".to_string(),
        }
    }
}

/// A job request as submitted by a caller. The same shape backs the HTTP
/// bodies and the interactive terminal flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobRequest {
    /// Source video URL; required unless a prior transcript is provided.
    pub url: Option<String>,
    /// Pre-existing timed transcript, for translate/synthesize jobs.
    pub transcript: Option<String>,
    /// Process only the first 60 seconds.
    pub test_mode: bool,
    /// Annotate breaths and pauses.
    pub breath_detection: bool,
    /// Source language tag override.
    pub language: Option<String>,
    pub post_edit: PostEditOptions,
    pub translation: TranslationOptions,
    pub synthesis: SynthesisOptions,
    /// Remux synthesized audio against the original video.
    pub mux: bool,
    /// Per-job cost cap override.
    pub max_cost_usd: Option<f64>,
}

impl Default for JobRequest {
    fn default() -> Self {
        Self {
            url: None,
            transcript: None,
            test_mode: false,
            breath_detection: true,
            language: None,
            post_edit: PostEditOptions::default(),
            translation: TranslationOptions::default(),
            synthesis: SynthesisOptions::default(),
            mux: false,
            max_cost_usd: None,
        }
    }
}

/// A job record. Mutated only through the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Weighted progress 0–100, non-decreasing within a run.
    pub progress: u8,
    /// Currently executing stage, if any.
    pub stage: Option<Stage>,
    pub request: JobRequest,
    pub ledger: CostLedger,
    /// Artifact kind -> path, populated by the producing stage.
    pub artifacts: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
    /// Winning (model, region) of the post-edit fallback, when it ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_editor_model: Option<String>,
    /// Winning (model, region) of the translation fallback, when it ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translator_model: Option<String>,
    /// Source title discovered during download.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Job {
    pub fn new(kind: JobKind, request: JobRequest) -> Self {
        Self {
            id: JobId::generate(),
            kind,
            status: JobStatus::Queued,
            progress: 0,
            stage: None,
            request,
            ledger: CostLedger::default(),
            artifacts: BTreeMap::new(),
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            error: None,
            post_editor_model: None,
            translator_model: None,
            title: None,
        }
    }
}

/// Cooperative cancellation flag, checked at stage entries and at every
/// long-poll iteration or chunk boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Running));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Cancelled));
        assert!(JobStatus::Running.can_transition_to(JobStatus::Cancelled));

        // terminal states admit nothing
        for terminal in [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled] {
            for next in [
                JobStatus::Queued,
                JobStatus::Running,
                JobStatus::Completed,
                JobStatus::Failed,
                JobStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_request_rejects_unknown_fields() {
        let raw = r#"{"url": "https://youtu.be/x", "frobnicate": true}"#;
        assert!(serde_json::from_str::<JobRequest>(raw).is_err());
    }

    #[test]
    fn test_request_defaults() {
        let req: JobRequest = serde_json::from_str(r#"{}"#).unwrap();
        assert!(req.breath_detection);
        assert!(!req.test_mode);
        assert_eq!(req.synthesis.provider, "auto");
        assert_eq!(req.translation.quality, "balanced");
    }
}
