//! ElevenLabs TTS provider adapter.

use super::chunks::{group_segments, synthesize_chunks};
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
use rand::Rng;
use serde_json::json;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{info, instrument, warn};

const TRANSIENT_RETRIES: u32 = 3;

/// ElevenLabs synthesizer.
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    settings: TtsSettings,
    catalog: RwLock<Vec<VoiceProfile>>,
}

impl ElevenLabsSynthesizer {
    pub fn new(settings: TtsSettings) -> Self {
        let catalog = builtin_catalog(settings.elevenlabs_price_per_1k);
        Self {
            client: crate::http::create_client(),
            settings,
            catalog: RwLock::new(catalog),
        }
    }

    fn api_key(&self) -> Result<&str> {
        self.settings
            .elevenlabs_api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| SzinkronError::Config("ELEVENLABS_API_KEY not configured".into()))
    }

    /// One synthesis API call for a batch of segments.
    async fn synthesize_call(
        &self,
        segments: &[TimedSegment],
        voice_id: &str,
        quality: AudioQuality,
        output_format: &str,
    ) -> Result<Vec<u8>> {
        let text = segments
            .iter()
            .map(|s| s.clean_text())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let body = json!({
            "text": text,
            "model_id": self.settings.elevenlabs_model,
            "output_format": output_format,
            "voice_settings": voice_settings(quality),
        });

        let mut attempt = 0u32;
        loop {
            let response = self
                .client
                .post(format!(
                    "{}/text-to-speech/{}",
                    self.settings.elevenlabs_base_url, voice_id
                ))
                .header("xi-api-key", self.api_key()?)
                .json(&body)
                .send()
                .await;

            let err = match response {
                Ok(resp) if resp.status().is_success() => {
                    return Ok(resp.bytes().await?.to_vec());
                }
                Ok(resp) => {
                    let status = resp.status();
                    let detail = resp.text().await.unwrap_or_default();
                    map_api_error(status, &detail, voice_id)
                }
                Err(e) => SzinkronError::TransientNetwork(e.to_string()),
            };

            // quota refusals surface immediately; retrying would thrash
            if err.is_transient() && attempt < TRANSIENT_RETRIES {
                attempt += 1;
                let backoff = 2f64.powi(attempt as i32) * rand::rng().random_range(0.5..1.5);
                warn!("ElevenLabs transient failure, retry {} in ~{:.1}s: {}", attempt, backoff, err);
                tokio::time::sleep(Duration::from_secs_f64(backoff)).await;
                continue;
            }
            return Err(err);
        }
    }
}

#[async_trait]
impl TtsSynthesizer for ElevenLabsSynthesizer {
    fn provider(&self) -> TtsProvider {
        TtsProvider::Elevenlabs
    }

    fn is_configured(&self) -> bool {
        self.settings
            .elevenlabs_api_key
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
            .get(format!("{}/voices", self.settings.elevenlabs_base_url))
            .header("xi-api-key", self.api_key()?)
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
                let Some(voice_id) = raw["voice_id"].as_str() else {
                    continue;
                };
                let name = raw["name"].as_str().unwrap_or("Unknown").to_string();
                voices.push(VoiceProfile {
                    provider: TtsProvider::Elevenlabs,
                    voice_id: voice_id.to_string(),
                    gender: detect_gender(&name, raw),
                    name,
                    language: raw["labels"]["language"].as_str().unwrap_or("en-US").to_string(),
                    tier: VoiceTier::Premium,
                    tone: raw["labels"]["description"].as_str().map(|s| s.to_string()),
                    price_per_1k_chars: self.settings.elevenlabs_price_per_1k,
                });
            }
        }

        if !voices.is_empty() {
            info!("Refreshed ElevenLabs catalog: {} voices", voices.len());
            *self.catalog.write().expect("catalog lock poisoned") = voices;
        }
        Ok(())
    }

    fn quote(&self, character_count: usize, voice_id: &str, _quality: AudioQuality) -> CostEstimate {
        CostEstimate {
            provider: TtsProvider::Elevenlabs,
            voice_id: voice_id.to_string(),
            character_count,
            amount_usd: character_count as f64 / 1000.0 * self.settings.elevenlabs_price_per_1k,
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

        // chunked output is stitched byte-wise, so chunks are always MP3
        // frames; a single-chunk run can honor the caller's format directly
        let audio = synthesize_chunks(chunks, self.settings.parallel_workers, cancel, |_, segs| {
            let voice_id = voice_id.to_string();
            async move {
                self.synthesize_call(&segs, &voice_id, quality, output_format(quality))
                    .await
            }
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

        // timing reconciliation: pad a shortfall, never trim an overrun
        let span = script.total_span_seconds();
        let mut duration = probe_duration(&final_path)
            .await
            .unwrap_or_else(|_| estimate_duration(character_count));
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
    match status.as_u16() {
        404 => SzinkronError::VoiceNotFound {
            provider: "elevenlabs".to_string(),
            voice_id: voice_id.to_string(),
        },
        401 | 403 => SzinkronError::Config(format!("ElevenLabs rejected credentials: {}", status)),
        429 => SzinkronError::QuotaExceeded(detail.chars().take(200).collect()),
        400..=499 => SzinkronError::InvalidRequest(detail.chars().take(200).collect()),
        _ => SzinkronError::TransientRemote(format!("status {}", status)),
    }
}

/// ElevenLabs output format token for a quality level.
fn output_format(quality: AudioQuality) -> &'static str {
    match quality {
        AudioQuality::Low => "mp3_22050_32",
        AudioQuality::Medium => "mp3_44100_64",
        AudioQuality::High => "mp3_44100_128",
    }
}

fn voice_settings(quality: AudioQuality) -> serde_json::Value {
    match quality {
        AudioQuality::High => json!({
            "stability": 0.5,
            "similarity_boost": 0.75,
            "style": 0.0,
            "use_speaker_boost": true,
        }),
        AudioQuality::Medium => json!({
            "stability": 0.6,
            "similarity_boost": 0.7,
            "style": 0.0,
            "use_speaker_boost": false,
        }),
        AudioQuality::Low => json!({
            "stability": 0.7,
            "similarity_boost": 0.6,
            "style": 0.0,
            "use_speaker_boost": false,
        }),
    }
}

/// Rough duration estimate at conversational speech rate.
fn estimate_duration(character_count: usize) -> f64 {
    character_count as f64 / 12.5
}

fn detect_gender(name: &str, raw: &serde_json::Value) -> Option<Gender> {
    match raw["labels"]["gender"].as_str() {
        Some("male") => return Some(Gender::Male),
        Some("female") => return Some(Gender::Female),
        _ => {}
    }
    let lower = name.to_lowercase();
    if lower.contains("male") && !lower.contains("female") {
        Some(Gender::Male)
    } else if lower.contains("female") {
        Some(Gender::Female)
    } else {
        None
    }
}

/// Popular voices available to every account, used until the remote catalog
/// is fetched.
fn builtin_catalog(price_per_1k: f64) -> Vec<VoiceProfile> {
    let voice = |voice_id: &str, name: &str, language: &str, gender: Gender, tone: &str| {
        VoiceProfile {
            provider: TtsProvider::Elevenlabs,
            voice_id: voice_id.to_string(),
            name: name.to_string(),
            language: language.to_string(),
            gender: Some(gender),
            tier: VoiceTier::Premium,
            tone: Some(tone.to_string()),
            price_per_1k_chars: price_per_1k,
        }
    };

    vec![
        voice("21m00Tcm4TlvDq8ikWAM", "Rachel", "en-US", Gender::Female, "clear"),
        voice("pNInz6obpgDQGcFmaJgB", "Adam", "en-US", Gender::Male, "deep"),
        voice("yoZ06aMxZJJ28mfd3POQ", "Sam", "en-US", Gender::Male, "conversational"),
        voice("piTKgcLEGmPE4e6mEKli", "Nicole", "en-US", Gender::Female, "warm"),
        voice("TxGEqnHWrfWFTfGW9XjX", "Josh", "en-US", Gender::Male, "professional"),
        voice("EXAVITQu4vr4xnSDxMaL", "Bella", "en-US", Gender::Female, "professional"),
        voice("ThT5KcBeYPX3keUQqHPh", "Dorothy", "en-GB", Gender::Female, "clear"),
        voice("ErXwobaYiN019PkySvjV", "Antoni", "en-US", Gender::Male, "versatile"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthesizer() -> ElevenLabsSynthesizer {
        ElevenLabsSynthesizer::new(TtsSettings::default())
    }

    #[test]
    fn test_builtin_catalog_and_voice_lookup() {
        let s = synthesizer();
        assert!(s.has_voice("pNInz6obpgDQGcFmaJgB"));
        assert!(!s.has_voice("nonexistent"));
        assert!(s.supports("en-US"));
        assert!(s.supports("en-GB"));
        assert!(!s.supports("hu-HU"));
    }

    #[test]
    fn test_quote_uses_rate_card() {
        let s = synthesizer();
        let estimate = s.quote(5000, "pNInz6obpgDQGcFmaJgB", AudioQuality::High);
        assert!((estimate.amount_usd - 1.5).abs() < 1e-9);
        assert_eq!(estimate.character_count, 5000);
    }

    #[test]
    fn test_output_format_by_quality() {
        assert_eq!(output_format(AudioQuality::Low), "mp3_22050_32");
        assert_eq!(output_format(AudioQuality::High), "mp3_44100_128");
    }

    #[test]
    fn test_error_mapping_quota_and_voice() {
        use reqwest::StatusCode;
        assert!(matches!(
            map_api_error(StatusCode::TOO_MANY_REQUESTS, "x", "v"),
            SzinkronError::QuotaExceeded(_)
        ));
        assert!(matches!(
            map_api_error(StatusCode::NOT_FOUND, "x", "v"),
            SzinkronError::VoiceNotFound { .. }
        ));
    }

    #[test]
    fn test_language_filter() {
        let s = synthesizer();
        let gb = s.list_voices(Some("en-GB"));
        assert_eq!(gb.len(), 1);
        assert_eq!(gb[0].name, "Dorothy");
        let all_en = s.list_voices(Some("en"));
        assert_eq!(all_en.len(), 8);
    }

    #[test]
    fn test_not_configured_without_key() {
        assert!(!synthesizer().is_configured());
    }
}
