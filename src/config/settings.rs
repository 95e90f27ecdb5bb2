//! Configuration settings for Szinkron.

use crate::error::{Result, SzinkronError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub recognizer: RecognizerSettings,
    pub pauses: PauseSettings,
    pub chunking: ChunkingSettings,
    pub genai: GenAiSettings,
    pub translation: TranslationSettings,
    pub tts: TtsSettings,
    pub video: VideoSettings,
    pub jobs: JobSettings,
    pub server: ServerSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for final artifacts (per-job subdirectories).
    pub data_dir: String,
    /// Directory for temporary files.
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.szinkron".to_string(),
            temp_dir: "/tmp/szinkron".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Speech recognition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerSettings {
    /// Files at most this size (MB) take the synchronous recognition path.
    pub sync_size_limit_mb: f64,
    /// Audio longer than this (seconds) takes the staged path regardless of size.
    pub sync_duration_limit_seconds: u32,
    /// Source language (BCP-47).
    pub language_code: String,
    /// Decoded audio sample rate handed to the recognizer.
    pub sample_rate: u32,
    /// Decoded audio channel count.
    pub channels: u32,
    /// Object-store bucket for staged recognition uploads.
    pub bucket: String,
    /// OAuth access token for the speech and storage APIs.
    pub access_token: Option<String>,
    /// Maximum media duration to process (seconds).
    pub max_duration_seconds: u32,
    /// Retry attempts when the recognizer reports quota exhaustion.
    pub quota_retry_attempts: u32,
    /// Recognition price per audio minute, used for cost quotes.
    pub price_per_minute: f64,
}

impl Default for RecognizerSettings {
    fn default() -> Self {
        Self {
            sync_size_limit_mb: 10.0,
            sync_duration_limit_seconds: 55,
            language_code: "hu-HU".to_string(),
            sample_rate: 16_000,
            channels: 1,
            bucket: "szinkron-audio-staging".to_string(),
            access_token: None,
            max_duration_seconds: 1800,
            quota_retry_attempts: 3,
            price_per_minute: 0.016,
        }
    }
}

/// Pause detection thresholds (seconds) and line policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PauseSettings {
    /// Gaps below this are not measured at all.
    pub min: f64,
    /// Short-breath threshold (inline marker).
    pub short: f64,
    /// Long-breath threshold (inline double marker).
    pub long: f64,
    /// Paragraph-break threshold (blank line).
    pub paragraph: f64,
    /// Gap after terminal punctuation that ends a sentence line.
    pub sentence_end: f64,
    /// Soft character limit before a line is broken onto a new timestamp.
    pub line_soft_limit: usize,
}

impl Default for PauseSettings {
    fn default() -> Self {
        Self {
            min: 0.3,
            short: 0.6,
            long: 1.5,
            paragraph: 3.0,
            sentence_end: 1.0,
            line_soft_limit: 100,
        }
    }
}

/// Text chunking settings for long scripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Characters per chunk.
    pub chunk_size: usize,
    /// Character overlap between consecutive chunks.
    pub chunk_overlap: usize,
    /// Hard cap on chunk count per call.
    pub max_chunks: usize,
    /// Scripts at most this long skip chunking entirely.
    pub single_pass_limit: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 4000,
            chunk_overlap: 200,
            max_chunks: 20,
            single_pass_limit: 5000,
        }
    }
}

/// Generative model settings shared by the post-editor and translator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenAiSettings {
    /// Model id, or "auto" to expand to the detection order.
    pub model: String,
    /// Ordered region candidates.
    pub regions: Vec<String>,
    /// Retry attempts per (region, model) pair on transient errors.
    pub max_attempts: u32,
    /// Project identifier embedded in the endpoint path.
    pub project: String,
    /// OAuth access token for the generative API.
    pub access_token: Option<String>,
    /// Price per million input characters, used for cost quotes.
    pub price_per_million_chars: f64,
}

impl Default for GenAiSettings {
    fn default() -> Self {
        Self {
            model: "auto".to_string(),
            regions: vec![
                "us-central1".to_string(),
                "us-east1".to_string(),
                "us-west1".to_string(),
                "europe-west4".to_string(),
            ],
            max_attempts: 2,
            project: String::new(),
            access_token: None,
            price_per_million_chars: 0.20,
        }
    }
}

/// Translation defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationSettings {
    pub default_target_language: String,
    pub default_context: String,
    pub default_audience: String,
    pub default_tone: String,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            default_target_language: "en-US".to_string(),
            default_context: "casual".to_string(),
            default_audience: "general public".to_string(),
            default_tone: "neutral".to_string(),
        }
    }
}

/// TTS provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    /// Default provider id, or "auto".
    pub default_provider: String,
    /// In auto mode, prefer the cheapest provider over the highest tier.
    pub auto_cost_first: bool,
    /// Per-call character cap before chunked synthesis kicks in.
    pub chunk_size_chars: usize,
    /// Bounded worker count for chunked synthesis.
    pub parallel_workers: usize,
    /// ElevenLabs configuration.
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_base_url: String,
    pub elevenlabs_model: String,
    pub elevenlabs_default_voice: String,
    /// ElevenLabs price per 1k characters.
    pub elevenlabs_price_per_1k: f64,
    /// Google TTS configuration.
    pub google_api_key: Option<String>,
    pub google_default_voice: String,
    pub google_timeout_seconds: u64,
    pub google_max_retries: u32,
    /// Google price per 1k characters for standard-tier voices.
    pub google_standard_price_per_1k: f64,
    /// Google price per 1k characters for neural/studio-tier voices.
    pub google_premium_price_per_1k: f64,
    /// Longest single SSML break a provider accepts (seconds).
    pub max_break_seconds: f64,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            default_provider: "auto".to_string(),
            auto_cost_first: true,
            chunk_size_chars: 1000,
            parallel_workers: 4,
            elevenlabs_api_key: None,
            elevenlabs_base_url: "https://api.elevenlabs.io/v1".to_string(),
            elevenlabs_model: "eleven_multilingual_v2".to_string(),
            elevenlabs_default_voice: "pNInz6obpgDQGcFmaJgB".to_string(),
            elevenlabs_price_per_1k: 0.30,
            google_api_key: None,
            google_default_voice: "en-US-Neural2-F".to_string(),
            google_timeout_seconds: 300,
            google_max_retries: 3,
            google_standard_price_per_1k: 0.004,
            google_premium_price_per_1k: 0.016,
            max_break_seconds: 10.0,
        }
    }
}

/// Video processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    /// Output container format.
    pub output_format: String,
    /// Directory for temporary video downloads.
    pub temp_dir: String,
    /// Muxer subprocess deadline (seconds).
    pub mux_deadline_seconds: u64,
    /// Download subprocess deadline (seconds).
    pub download_deadline_seconds: u64,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            output_format: "mp4".to_string(),
            temp_dir: "/tmp/szinkron/video".to_string(),
            mux_deadline_seconds: 1800,
            download_deadline_seconds: 600,
        }
    }
}

/// Job execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Fixed worker pool size.
    pub max_concurrent_jobs: usize,
    /// Per-job cost cap in USD; None means unbounded.
    pub max_cost_usd: Option<f64>,
    /// Terminal jobs older than this are swept with their files.
    pub artifact_ttl_seconds: Option<u64>,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 5,
            max_cost_usd: None,
            artifact_ttl_seconds: None,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Settings {
    /// Load settings from the default location, or defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from an explicit path, falling back to
    /// `~/.szinkron/config.toml`, then to defaults. Environment variables
    /// override individual keys afterwards.
    pub fn load_from(path: Option<&str>) -> Result<Self> {
        let candidate = match path {
            Some(p) => Some(PathBuf::from(p)),
            None => dirs_config_path(),
        };

        let mut settings = match candidate {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(&p)?;
                toml::from_str(&raw)?
            }
            Some(p) if path.is_some() => {
                return Err(SzinkronError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            _ => Settings::default(),
        };

        settings.apply_env_overrides();
        settings.validate()?;
        Ok(settings)
    }

    /// Apply the recognized environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<f64>("SYNC_SIZE_LIMIT_MB") {
            self.recognizer.sync_size_limit_mb = v;
        }
        if let Ok(v) = std::env::var("LANGUAGE_CODE") {
            self.recognizer.language_code = v;
        }
        if let Ok(v) = std::env::var("GCS_BUCKET_NAME") {
            self.recognizer.bucket = v;
        }
        if let Ok(v) = std::env::var("GOOGLE_ACCESS_TOKEN") {
            if !v.is_empty() {
                self.recognizer.access_token = Some(v.clone());
                self.genai.access_token = Some(v);
            }
        }
        if let Some(v) = env_parse::<usize>("MAX_CONCURRENT_JOBS") {
            self.jobs.max_concurrent_jobs = v;
        }
        if let Some(v) = env_parse::<usize>("CHUNK_SIZE") {
            self.chunking.chunk_size = v;
        }
        if let Some(v) = env_parse::<usize>("CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = v;
        }
        if let Some(v) = env_parse::<usize>("MAX_CHUNKS") {
            self.chunking.max_chunks = v;
        }
        if let Ok(v) = std::env::var("TTS_DEFAULT_PROVIDER") {
            self.tts.default_provider = v;
        }
        if let Some(v) = env_parse::<bool>("TTS_AUTO_COST_FIRST") {
            self.tts.auto_cost_first = v;
        }
        if let Ok(v) = std::env::var("ELEVENLABS_API_KEY") {
            if !v.is_empty() {
                self.tts.elevenlabs_api_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("GOOGLE_TTS_API_KEY") {
            if !v.is_empty() {
                self.tts.google_api_key = Some(v);
            }
        }
        if let Ok(v) = std::env::var("POST_EDITOR_MODEL") {
            self.genai.model = v;
        }
        if let Ok(v) = std::env::var("REGION_LIST") {
            let regions: Vec<String> = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !regions.is_empty() {
                self.genai.regions = regions;
            }
        }
        if let Ok(v) = std::env::var("GENAI_PROJECT") {
            self.genai.project = v;
        }
        if let Some(v) = env_parse::<f64>("MAX_COST_USD_PER_JOB") {
            self.jobs.max_cost_usd = Some(v);
        }
        if let Ok(v) = std::env::var("TEMP_DIR") {
            self.general.temp_dir = v;
        }
        if let Some(v) = env_parse::<u64>("ARTIFACT_TTL_SECONDS") {
            self.jobs.artifact_ttl_seconds = Some(v);
        }
    }

    /// Reject settings combinations that would misbehave at runtime.
    fn validate(&self) -> Result<()> {
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(SzinkronError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.chunking.max_chunks == 0 {
            return Err(SzinkronError::Config("max_chunks must be at least 1".into()));
        }
        if self.jobs.max_concurrent_jobs == 0 {
            return Err(SzinkronError::Config(
                "max_concurrent_jobs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Expanded data directory.
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.general.data_dir)
    }

    /// Expanded temp directory.
    pub fn temp_dir(&self) -> PathBuf {
        expand_tilde(&self.general.temp_dir)
    }

    /// Expanded video temp directory.
    pub fn video_temp_dir(&self) -> PathBuf {
        expand_tilde(&self.video.temp_dir)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn dirs_config_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".szinkron").join("config.toml"))
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.recognizer.sync_size_limit_mb, 10.0);
        assert_eq!(s.recognizer.language_code, "hu-HU");
        assert_eq!(s.jobs.max_concurrent_jobs, 5);
        assert_eq!(s.pauses.short, 0.6);
        assert_eq!(s.pauses.long, 1.5);
        assert_eq!(s.pauses.paragraph, 3.0);
        assert!(s.jobs.max_cost_usd.is_none());
    }

    #[test]
    fn test_validate_rejects_overlap_ge_size() {
        let mut s = Settings::default();
        s.chunking.chunk_overlap = s.chunking.chunk_size;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let s: Settings = toml::from_str(
            r#"
            [recognizer]
            language_code = "de-DE"
            "#,
        )
        .unwrap();
        assert_eq!(s.recognizer.language_code, "de-DE");
        assert_eq!(s.recognizer.sync_size_limit_mb, 10.0);
        assert_eq!(s.tts.default_provider, "auto");
    }
}
