//! Text-to-speech abstraction and providers.
//!
//! A provider exposes its voice catalog, a rate-card cost quote, and timed
//! script synthesis. The registry owns provider instances and implements
//! auto-selection and cross-provider voice equivalence.

mod chunks;
mod elevenlabs;
mod equivalence;
mod google;
mod registry;
mod ssml;

pub use chunks::group_segments;
pub use elevenlabs::ElevenLabsSynthesizer;
pub use equivalence::{equivalent_voice, nearest_voice};
pub use google::GoogleTtsSynthesizer;
pub use registry::{CostComparison, ProviderRegistry, ProviderSummary};
pub use ssml::script_to_ssml;

use crate::error::Result;
use crate::jobs::{AudioQuality, CancelToken};
use crate::segmenter::Script;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Provider identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtsProvider {
    Elevenlabs,
    GoogleTts,
}

impl TtsProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            TtsProvider::Elevenlabs => "elevenlabs",
            TtsProvider::GoogleTts => "google_tts",
        }
    }

    pub fn all() -> &'static [TtsProvider] {
        &[TtsProvider::GoogleTts, TtsProvider::Elevenlabs]
    }
}

impl std::str::FromStr for TtsProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elevenlabs" => Ok(TtsProvider::Elevenlabs),
            "google_tts" | "google" => Ok(TtsProvider::GoogleTts),
            _ => Err(format!("Unknown TTS provider: {}", s)),
        }
    }
}

impl std::fmt::Display for TtsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Voice gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Voice quality tier, comparable across providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceTier {
    Standard,
    Enhanced,
    Premium,
    Studio,
}

/// A voice offered by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub provider: TtsProvider,
    /// Opaque provider-specific identifier. Selection never parses it.
    pub voice_id: String,
    pub name: String,
    /// BCP-47 language tag.
    pub language: String,
    pub gender: Option<Gender>,
    pub tier: VoiceTier,
    /// Tone tag used by nearest-voice matching (e.g. "warm", "deep").
    pub tone: Option<String>,
    /// Price per 1000 characters in USD.
    pub price_per_1k_chars: f64,
}

/// Rate-card cost estimate; computed locally, never an API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostEstimate {
    pub provider: TtsProvider,
    pub voice_id: String,
    pub character_count: usize,
    pub amount_usd: f64,
}

/// Result of a synthesis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisOutput {
    pub audio_path: PathBuf,
    pub duration_seconds: f64,
    pub byte_count: u64,
    pub character_count: usize,
    pub cost_usd: f64,
    pub provider: TtsProvider,
    pub voice_id: String,
}

/// Trait implemented by every TTS provider adapter.
#[async_trait]
pub trait TtsSynthesizer: Send + Sync {
    fn provider(&self) -> TtsProvider;

    /// Whether credentials are present.
    fn is_configured(&self) -> bool;

    /// Cached voice catalog, optionally filtered by language tag prefix.
    fn list_voices(&self, language: Option<&str>) -> Vec<VoiceProfile>;

    /// Refresh the catalog from the remote service.
    async fn refresh_catalog(&self) -> Result<()>;

    /// Rate-card quote for synthesizing `character_count` characters.
    fn quote(&self, character_count: usize, voice_id: &str, quality: AudioQuality) -> CostEstimate;

    /// Synthesize a timed script to `output_path`.
    async fn synthesize(
        &self,
        script: &Script,
        voice_id: &str,
        quality: AudioQuality,
        format: &str,
        output_path: &Path,
        cancel: &CancelToken,
    ) -> Result<SynthesisOutput>;

    /// Whether any catalog voice speaks `language`.
    fn supports(&self, language: &str) -> bool {
        !self.list_voices(Some(language)).is_empty()
    }

    /// Whether `voice_id` exists in the catalog.
    fn has_voice(&self, voice_id: &str) -> bool {
        self.list_voices(None).iter().any(|v| v.voice_id == voice_id)
    }
}

impl std::fmt::Debug for dyn TtsSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtsSynthesizer")
            .field("provider", &self.provider())
            .finish()
    }
}

/// Language filter: a full tag must match exactly; a bare primary subtag
/// ("en") matches any region of that language.
pub(crate) fn language_matches(voice_language: &str, filter: &str) -> bool {
    if filter.contains('-') {
        return voice_language.eq_ignore_ascii_case(filter);
    }
    voice_language
        .split('-')
        .next()
        .is_some_and(|p| p.eq_ignore_ascii_case(filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parsing() {
        assert_eq!("elevenlabs".parse::<TtsProvider>().unwrap(), TtsProvider::Elevenlabs);
        assert_eq!("google_tts".parse::<TtsProvider>().unwrap(), TtsProvider::GoogleTts);
        assert!("auto".parse::<TtsProvider>().is_err());
    }

    #[test]
    fn test_tier_ordering() {
        assert!(VoiceTier::Studio > VoiceTier::Premium);
        assert!(VoiceTier::Premium > VoiceTier::Enhanced);
        assert!(VoiceTier::Enhanced > VoiceTier::Standard);
    }

    #[test]
    fn test_language_matches() {
        assert!(language_matches("en-US", "en-US"));
        assert!(language_matches("en-US", "en"));
        assert!(!language_matches("en-GB", "en-US"));
        assert!(!language_matches("hu-HU", "en-US"));
    }
}
