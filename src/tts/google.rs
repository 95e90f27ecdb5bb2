//! Google Cloud Text-to-Speech provider adapter.

use super::chunks::{group_segments, synthesize_chunks};
use super::ssml::script_to_ssml;
use super::{
    language_matches, CostEstimate, Gender, SynthesisOutput, TtsProvider, TtsSynthesizer,
    VoiceProfile, VoiceTier,
};
use crate::config::TtsSettings;
use crate::error::{Result, SzinkronError};
use crate::jobs::{AudioQuality, CancelToken};
use crate::media::{pad_with_silence, probe_duration, recode_audio};
use crate::segmenter::{Script, TimedSegment};
use async_trait::async_trait;
use base64::Engine;
use rand::Rng;
use serde_json::json;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{info, instrument, warn};

const TTS_BASE: &str = "https://texttospeech.googleapis.com/v1";

/// Google Cloud TTS synthesizer.
pub struct GoogleTtsSynthesizer {
    client: reqwest::Client,
    settings: TtsSettings,
    catalog: RwLock<Vec<VoiceProfile>>,
}

impl GoogleTtsSynthesizer {
    pub fn new(settings: TtsSettings) -> Self {
        let catalog = builtin_catalog(&settings);
        Self {
            client: crate::http::create_client_with_timeout(Duration::from_secs(
                settings.google_timeout_seconds,
            )),
            settings,
            catalog: RwLock::new(catalog),
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.settings
            .google_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| SzinkronError::Config("GOOGLE_TTS_API_KEY not configured".into()))
    }

    fn language_of(&self, voice_id: &str) -> String {
        self.list_voices(None)
            .iter()
            .find(|v| v.voice_id == voice_id)
            .map(|v| v.language.clone())
            .unwrap_or_else(|| language_from_voice_id(voice_id))
    }

    /// One `text:synthesize` call over a batch of segments.
    async fn synthesize_call(
        &self,
        segments: &[TimedSegment],
        voice_id: &str,
        quality: AudioQuality,
    ) -> Result<Vec<u8>> {
        let ssml = script_to_ssml(segments, self.settings.max_break_seconds);
        let body = json!({
            "input": { "ssml": ssml },
            "voice": {
                "languageCode": self.language_of(voice_id),
                "name": voice_id,
            },
            "audioConfig": {
                "audioEncoding": "MP3",
                "sampleRateHertz": sample_rate(quality),
            },
        });

        let mut attempt = 0u32;
        loop {
            let response = self
                .client
                .post(format!("{}/text:synthesize", TTS_BASE))
                .query(&[("key", self.api_key()?)])
                .json(&body)
                .send()
                .await;

            let err = match response {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: serde_json::Value = resp.json().await?;
                    let content = parsed["audioContent"].as_str().ok_or_else(|| {
                        SzinkronError::TransientRemote("Synthesis response had no audio".into())
                    })?;
                    return base64::engine::general_purpose::STANDARD
                        .decode(content)
                        .map_err(|e| {
                            SzinkronError::TransientRemote(format!("Undecodable audio: {}", e))
                        });
                }
                Ok(resp) => {
                    let status = resp.status();
                    let detail = resp.text().await.unwrap_or_default();
                    map_api_error(status, &detail, voice_id)
                }
                Err(e) => SzinkronError::TransientNetwork(e.to_string()),
            };

            // quota refusals surface immediately; retrying would thrash
            if err.is_transient() && attempt < self.settings.google_max_retries {
                attempt += 1;
                let backoff = 2f64.powi(attempt as i32) * rand::rng().random_range(0.5..1.5);
                warn!("Google TTS transient failure, retry {} in ~{:.1}s: {}", attempt, backoff, err);
                tokio::time::sleep(Duration::from_secs_f64(backoff)).await;
                continue;
            }
            return Err(err);
        }
    }

    fn rate_for(&self, voice_id: &str) -> f64 {
        let tier = self
            .list_voices(None)
            .iter()
            .find(|v| v.voice_id == voice_id)
            .map(|v| v.tier)
            .unwrap_or(if voice_id.contains("Standard") {
                VoiceTier::Standard
            } else {
                VoiceTier::Premium
            });
        match tier {
            VoiceTier::Standard => self.settings.google_standard_price_per_1k,
            _ => self.settings.google_premium_price_per_1k,
        }
    }
}

#[async_trait]
impl TtsSynthesizer for GoogleTtsSynthesizer {
    fn provider(&self) -> TtsProvider {
        TtsProvider::GoogleTts
    }

    fn is_configured(&self) -> bool {
        self.settings
            .google_api_key
            .as_deref()
            .is_some_and(|k| !k.is_empty())
    }

    fn list_voices(&self, language: Option<&str>) -> Vec<VoiceProfile> {
        let catalog = self.catalog.read().expect("catalog lock poisoned");
        catalog
            .iter()
            .filter(|v| language.is_none_or(|l| language_matches(&v.language, l)))
            .cloned()
            .collect()
    }

    async fn refresh_catalog(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/voices", TTS_BASE))
            .query(&[("key", self.api_key()?)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SzinkronError::TransientRemote(format!(
                "Voice listing failed: {}",
                response.status()
            )));
        }

        let parsed: serde_json::Value = response.json().await?;
        let mut voices = Vec::new();
        if let Some(list) = parsed["voices"].as_array() {
            for raw in list {
                let Some(name) = raw["name"].as_str() else {
                    continue;
                };
                let language = raw["languageCodes"][0]
                    .as_str()
                    .unwrap_or("en-US")
                    .to_string();
                let tier = tier_from_voice_id(name);
                voices.push(VoiceProfile {
                    provider: TtsProvider::GoogleTts,
                    voice_id: name.to_string(),
                    name: name.to_string(),
                    language,
                    gender: match raw["ssmlGender"].as_str() {
                        Some("MALE") => Some(Gender::Male),
                        Some("FEMALE") => Some(Gender::Female),
                        _ => None,
                    },
                    tier,
                    tone: None,
                    price_per_1k_chars: match tier {
                        VoiceTier::Standard => self.settings.google_standard_price_per_1k,
                        _ => self.settings.google_premium_price_per_1k,
                    },
                });
            }
        }

        if !voices.is_empty() {
            info!("Refreshed Google TTS catalog: {} voices", voices.len());
            *self.catalog.write().expect("catalog lock poisoned") = voices;
        }
        Ok(())
    }

    fn quote(&self, character_count: usize, voice_id: &str, _quality: AudioQuality) -> CostEstimate {
        CostEstimate {
            provider: TtsProvider::GoogleTts,
            voice_id: voice_id.to_string(),
            character_count,
            amount_usd: character_count as f64 / 1000.0 * self.rate_for(voice_id),
        }
    }

    #[instrument(skip_all, fields(voice = voice_id, format))]
    async fn synthesize(
        &self,
        script: &Script,
        voice_id: &str,
        quality: AudioQuality,
        format: &str,
        output_path: &Path,
        cancel: &CancelToken,
    ) -> Result<SynthesisOutput> {
        if !self.has_voice(voice_id) {
            return Err(SzinkronError::VoiceNotFound {
                provider: self.provider().as_str().to_string(),
                voice_id: voice_id.to_string(),
            });
        }

        let chunks = group_segments(&script.segments, self.settings.chunk_size_chars);
        let character_count: usize = script
            .segments
            .iter()
            .map(|s| s.clean_text().chars().count())
            .sum();

        let audio = synthesize_chunks(chunks, self.settings.parallel_workers, cancel, |_, segs| {
            let voice_id = voice_id.to_string();
            async move { self.synthesize_call(&segs, &voice_id, quality).await }
        })
        .await?;

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut final_path = output_path.to_path_buf();
        tokio::fs::write(&final_path, &audio).await?;

        if format != "mp3" {
            final_path = recode_audio(&final_path, format).await?;
        }

        let span = script.total_span_seconds();
        let mut duration = probe_duration(&final_path)
            .await
            .unwrap_or_else(|_| character_count as f64 / 12.5);
        if span > 0.0 && duration + 1.0 < span {
            final_path = pad_with_silence(&final_path, span).await?;
            duration = span;
        } else if span > 0.0 && duration > span * 1.05 {
            warn!(
                "Synthesized audio runs {:.1}s past the source span of {:.1}s",
                duration - span,
                span
            );
        }

        let byte_count = tokio::fs::metadata(&final_path).await?.len();
        Ok(SynthesisOutput {
            audio_path: final_path,
            duration_seconds: duration,
            byte_count,
            character_count,
            cost_usd: self.quote(character_count, voice_id, quality).amount_usd,
            provider: self.provider(),
            voice_id: voice_id.to_string(),
        })
    }
}

fn map_api_error(status: reqwest::StatusCode, detail: &str, voice_id: &str) -> SzinkronError {
    let lower = detail.to_lowercase();
    match status.as_u16() {
        404 => SzinkronError::VoiceNotFound {
            provider: "google_tts".to_string(),
            voice_id: voice_id.to_string(),
        },
        400 if lower.contains("voice") => SzinkronError::VoiceNotFound {
            provider: "google_tts".to_string(),
            voice_id: voice_id.to_string(),
        },
        401 | 403 => SzinkronError::Config(format!("Google TTS rejected credentials: {}", status)),
        429 => SzinkronError::QuotaExceeded(detail.chars().take(200).collect()),
        400..=499 => SzinkronError::InvalidRequest(detail.chars().take(200).collect()),
        _ => SzinkronError::TransientRemote(format!("status {}", status)),
    }
}

fn sample_rate(quality: AudioQuality) -> u32 {
    match quality {
        AudioQuality::Low => 22_050,
        AudioQuality::Medium | AudioQuality::High => 44_100,
    }
}

/// Tier from the family name embedded in a Google voice id.
fn tier_from_voice_id(voice_id: &str) -> VoiceTier {
    if voice_id.contains("Studio") {
        VoiceTier::Studio
    } else if voice_id.contains("Neural2") || voice_id.contains("Journey") {
        VoiceTier::Premium
    } else if voice_id.contains("Wavenet") {
        VoiceTier::Enhanced
    } else {
        VoiceTier::Standard
    }
}

/// Language tag prefix of a Google voice id like `en-US-Neural2-F`.
fn language_from_voice_id(voice_id: &str) -> String {
    let parts: Vec<&str> = voice_id.split('-').collect();
    if parts.len() >= 2 {
        format!("{}-{}", parts[0], parts[1])
    } else {
        "en-US".to_string()
    }
}

/// Well-known voices available without a catalog fetch.
fn builtin_catalog(settings: &TtsSettings) -> Vec<VoiceProfile> {
    let premium = settings.google_premium_price_per_1k;
    let standard = settings.google_standard_price_per_1k;

    let voice = |voice_id: &str, gender: Gender, tone: Option<&str>, price: f64| VoiceProfile {
        provider: TtsProvider::GoogleTts,
        voice_id: voice_id.to_string(),
        name: voice_id.to_string(),
        language: language_from_voice_id(voice_id),
        gender: Some(gender),
        tier: tier_from_voice_id(voice_id),
        tone: tone.map(|t| t.to_string()),
        price_per_1k_chars: price,
    };

    vec![
        voice("en-US-Neural2-A", Gender::Male, Some("conversational"), premium),
        voice("en-US-Neural2-C", Gender::Male, Some("professional"), premium),
        voice("en-US-Neural2-D", Gender::Male, Some("deep"), premium),
        voice("en-US-Neural2-E", Gender::Female, Some("warm"), premium),
        voice("en-US-Neural2-F", Gender::Female, Some("clear"), premium),
        voice("en-US-Neural2-G", Gender::Female, Some("professional"), premium),
        voice("en-US-Neural2-J", Gender::Male, Some("versatile"), premium),
        voice("en-GB-Neural2-A", Gender::Female, Some("clear"), premium),
        voice("en-US-Standard-B", Gender::Male, None, standard),
        voice("en-US-Standard-C", Gender::Female, None, standard),
        voice("de-DE-Neural2-B", Gender::Male, None, premium),
        voice("de-DE-Neural2-F", Gender::Female, None, premium),
        voice("hu-HU-Wavenet-A", Gender::Female, None, premium),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthesizer() -> GoogleTtsSynthesizer {
        GoogleTtsSynthesizer::new(TtsSettings::default())
    }

    #[test]
    fn test_tier_from_voice_id() {
        assert_eq!(tier_from_voice_id("en-US-Neural2-F"), VoiceTier::Premium);
        assert_eq!(tier_from_voice_id("en-US-Studio-O"), VoiceTier::Studio);
        assert_eq!(tier_from_voice_id("hu-HU-Wavenet-A"), VoiceTier::Enhanced);
        assert_eq!(tier_from_voice_id("en-US-Standard-B"), VoiceTier::Standard);
    }

    #[test]
    fn test_language_from_voice_id() {
        assert_eq!(language_from_voice_id("en-US-Neural2-F"), "en-US");
        assert_eq!(language_from_voice_id("hu-HU-Wavenet-A"), "hu-HU");
    }

    #[test]
    fn test_quote_differs_by_tier() {
        let s = synthesizer();
        let premium = s.quote(1000, "en-US-Neural2-F", AudioQuality::High);
        let standard = s.quote(1000, "en-US-Standard-B", AudioQuality::High);
        assert!(premium.amount_usd > standard.amount_usd);
        assert!((premium.amount_usd - 0.016).abs() < 1e-9);
        assert!((standard.amount_usd - 0.004).abs() < 1e-9);
    }

    #[test]
    fn test_catalog_supports_languages() {
        let s = synthesizer();
        assert!(s.supports("en-US"));
        assert!(s.supports("hu-HU"));
        assert!(s.supports("de-DE"));
        assert!(!s.supports("ja-JP"));
        assert!(s.has_voice("en-US-Neural2-F"));
        assert!(!s.has_voice("en-US-Neural2-Z"));
    }
}
