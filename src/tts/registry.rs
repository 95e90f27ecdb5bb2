//! Provider registry and selection policy.
//!
//! The orchestrator holds a registry handle, never a concrete provider.
//! Explicit provider requests are honored verbatim (an unknown voice fails,
//! it is never remapped); `auto` picks the cheapest provider that supports
//! the language and carries the requested voice or its equivalent.

use super::equivalence::{equivalent_voice, nearest_voice};
use super::{
    CostEstimate, ElevenLabsSynthesizer, GoogleTtsSynthesizer, TtsProvider, TtsSynthesizer,
    VoiceProfile, VoiceTier,
};
use crate::config::TtsSettings;
use crate::error::{Result, SzinkronError};
use crate::jobs::AudioQuality;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Cost band multiplier: candidates within this factor of the cheapest
/// quote compete on quality tier when cost is not the first criterion.
const COST_BAND: f64 = 1.5;

/// Registry of provider instances, keyed by provider id.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn TtsSynthesizer>>,
    settings: TtsSettings,
}

/// Provider metadata row for the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSummary {
    pub id: String,
    pub configured: bool,
    pub voices_count: usize,
    pub rate_per_1k: f64,
    pub languages: Vec<String>,
}

/// One row of a cross-provider cost comparison.
#[derive(Debug, Clone, Serialize)]
pub struct CostComparison {
    pub provider: String,
    pub voice_id: String,
    pub cost_usd: f64,
}

impl ProviderRegistry {
    pub fn new(settings: TtsSettings) -> Self {
        let providers: Vec<Arc<dyn TtsSynthesizer>> = vec![
            Arc::new(GoogleTtsSynthesizer::new(settings.clone())),
            Arc::new(ElevenLabsSynthesizer::new(settings.clone())),
        ];
        Self {
            providers,
            settings,
        }
    }

    pub fn get(&self, provider: TtsProvider) -> Option<Arc<dyn TtsSynthesizer>> {
        self.providers
            .iter()
            .find(|p| p.provider() == provider)
            .cloned()
    }

    /// Providers with credentials present.
    pub fn configured(&self) -> Vec<Arc<dyn TtsSynthesizer>> {
        self.providers
            .iter()
            .filter(|p| p.is_configured())
            .cloned()
            .collect()
    }

    pub fn any_configured(&self) -> bool {
        self.providers.iter().any(|p| p.is_configured())
    }

    /// Re-fetch every configured provider's catalog.
    pub async fn refresh_catalogs(&self) {
        for provider in self.configured() {
            if let Err(e) = provider.refresh_catalog().await {
                debug!("Catalog refresh for {} failed: {}", provider.provider(), e);
            }
        }
    }

    /// Resolve the (provider, voice) pair for a synthesis request.
    ///
    /// `provider_choice` is a provider id or `auto`. With an explicit
    /// provider, a missing voice is a hard `VoiceNotFound`; auto mode picks
    /// the cheapest supporting provider, honoring `cost_first`.
    pub fn select(
        &self,
        provider_choice: &str,
        voice_id: Option<&str>,
        language: &str,
    ) -> Result<(Arc<dyn TtsSynthesizer>, String)> {
        if provider_choice != "auto" {
            return self.select_explicit(provider_choice, voice_id, language);
        }
        self.select_auto(voice_id, language, self.settings.auto_cost_first)
    }

    fn select_explicit(
        &self,
        provider_id: &str,
        voice_id: Option<&str>,
        language: &str,
    ) -> Result<(Arc<dyn TtsSynthesizer>, String)> {
        let provider: TtsProvider = provider_id
            .parse()
            .map_err(SzinkronError::InvalidRequest)?;
        let synth = self
            .get(provider)
            .ok_or_else(|| SzinkronError::InvalidRequest(format!("Unknown provider: {}", provider_id)))?;

        if !synth.is_configured() {
            return Err(SzinkronError::Config(format!(
                "TTS provider {} is not configured",
                provider_id
            )));
        }

        let voice = match voice_id {
            // the caller asked for this exact voice; never remap
            Some(v) => {
                if !synth.has_voice(v) {
                    return Err(SzinkronError::VoiceNotFound {
                        provider: provider_id.to_string(),
                        voice_id: v.to_string(),
                    });
                }
                v.to_string()
            }
            None => self.default_voice(&synth, language)?,
        };

        Ok((synth, voice))
    }

    fn select_auto(
        &self,
        voice_id: Option<&str>,
        language: &str,
        cost_first: bool,
    ) -> Result<(Arc<dyn TtsSynthesizer>, String)> {
        let mut candidates: Vec<(Arc<dyn TtsSynthesizer>, String, CostEstimate, VoiceTier)> =
            Vec::new();

        for synth in self.configured() {
            if !synth.supports(language) {
                continue;
            }
            let Some(voice) = self.resolve_voice_on(&synth, voice_id, language) else {
                continue;
            };
            let tier = synth
                .list_voices(None)
                .iter()
                .find(|v| v.voice_id == voice)
                .map(|v| v.tier)
                .unwrap_or(VoiceTier::Standard);
            let quote = synth.quote(1000, &voice, AudioQuality::High);
            candidates.push((synth, voice, quote, tier));
        }

        if candidates.is_empty() {
            return Err(SzinkronError::UnsupportedLanguage(format!(
                "No configured TTS provider supports {}",
                language
            )));
        }

        let cheapest = candidates
            .iter()
            .map(|(_, _, q, _)| q.amount_usd)
            .fold(f64::INFINITY, f64::min);

        let winner = if cost_first {
            candidates
                .into_iter()
                .min_by(|a, b| a.2.amount_usd.total_cmp(&b.2.amount_usd))
        } else {
            // prefer higher tiers within the cheapest cost band
            candidates
                .into_iter()
                .filter(|(_, _, q, _)| q.amount_usd <= cheapest * COST_BAND)
                .max_by(|a, b| {
                    a.3.cmp(&b.3)
                        .then(b.2.amount_usd.total_cmp(&a.2.amount_usd))
                })
        };

        let (synth, voice, quote, _) = winner.expect("candidates verified non-empty");
        info!(
            "Auto-selected {} voice {} (${:.4}/1k)",
            synth.provider(),
            voice,
            quote.amount_usd
        );
        Ok((synth, voice))
    }

    /// Find a usable voice on `synth` for an auto-mode request.
    fn resolve_voice_on(
        &self,
        synth: &Arc<dyn TtsSynthesizer>,
        voice_id: Option<&str>,
        language: &str,
    ) -> Option<String> {
        let Some(requested) = voice_id else {
            return self.default_voice(synth, language).ok();
        };

        if synth.has_voice(requested) {
            return Some(requested.to_string());
        }

        // the requested voice lives on another provider: table first,
        // then nearest-voice over this provider's catalog
        let owner = self
            .providers
            .iter()
            .find(|p| p.has_voice(requested))?;

        if let Some(mapped) = equivalent_voice(owner.provider(), requested, synth.provider()) {
            if synth.has_voice(&mapped) {
                return Some(mapped);
            }
        }

        let reference: VoiceProfile = owner
            .list_voices(None)
            .into_iter()
            .find(|v| v.voice_id == requested)?;
        let catalog = synth.list_voices(None);
        nearest_voice(&reference, &catalog).map(|v| v.voice_id.clone())
    }

    /// Default voice on a provider for a language: the configured default
    /// when it matches, otherwise the best-tier catalog voice.
    fn default_voice(&self, synth: &Arc<dyn TtsSynthesizer>, language: &str) -> Result<String> {
        let configured_default = match synth.provider() {
            TtsProvider::Elevenlabs => &self.settings.elevenlabs_default_voice,
            TtsProvider::GoogleTts => &self.settings.google_default_voice,
        };

        let voices = synth.list_voices(Some(language));
        if voices.iter().any(|v| &v.voice_id == configured_default) {
            return Ok(configured_default.clone());
        }

        voices
            .into_iter()
            .max_by(|a, b| {
                a.tier
                    .cmp(&b.tier)
                    .then(b.price_per_1k_chars.total_cmp(&a.price_per_1k_chars))
            })
            .map(|v| v.voice_id)
            .ok_or_else(|| {
                SzinkronError::UnsupportedLanguage(format!(
                    "{} has no voice for {}",
                    synth.provider(),
                    language
                ))
            })
    }

    /// Provider metadata for the listing endpoint.
    pub fn summaries(&self) -> Vec<ProviderSummary> {
        self.providers
            .iter()
            .map(|p| {
                let voices = p.list_voices(None);
                let mut languages: Vec<String> =
                    voices.iter().map(|v| v.language.clone()).collect();
                languages.sort();
                languages.dedup();
                ProviderSummary {
                    id: p.provider().as_str().to_string(),
                    configured: p.is_configured(),
                    voices_count: voices.len(),
                    rate_per_1k: p.quote(1000, "", AudioQuality::High).amount_usd,
                    languages,
                }
            })
            .collect()
    }

    /// Quote `text` on every configured provider and rank by cost.
    pub fn cost_comparison(&self, text: &str, language: &str) -> Vec<CostComparison> {
        let chars = text.chars().count();
        let mut rows: Vec<CostComparison> = self
            .configured()
            .into_iter()
            .filter_map(|p| {
                let voice = self.default_voice(&p, language).ok()?;
                let quote = p.quote(chars, &voice, AudioQuality::High);
                Some(CostComparison {
                    provider: p.provider().as_str().to_string(),
                    voice_id: voice,
                    cost_usd: quote.amount_usd,
                })
            })
            .collect();
        rows.sort_by(|a, b| a.cost_usd.total_cmp(&b.cost_usd));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_keys() -> ProviderRegistry {
        let mut settings = TtsSettings::default();
        settings.elevenlabs_api_key = Some("el-key".into());
        settings.google_api_key = Some("g-key".into());
        ProviderRegistry::new(settings)
    }

    fn registry_without_keys() -> ProviderRegistry {
        ProviderRegistry::new(TtsSettings::default())
    }

    #[test]
    fn test_explicit_unknown_voice_is_not_remapped() {
        let registry = registry_with_keys();
        let err = registry
            .select("elevenlabs", Some("V-not-in-P"), "en-US")
            .unwrap_err();
        assert!(matches!(err, SzinkronError::VoiceNotFound { .. }));
    }

    #[test]
    fn test_explicit_known_voice_is_used_verbatim() {
        let registry = registry_with_keys();
        let (synth, voice) = registry
            .select("elevenlabs", Some("pNInz6obpgDQGcFmaJgB"), "en-US")
            .unwrap();
        assert_eq!(synth.provider(), TtsProvider::Elevenlabs);
        assert_eq!(voice, "pNInz6obpgDQGcFmaJgB");
    }

    #[test]
    fn test_auto_cost_first_picks_cheapest() {
        let registry = registry_with_keys();
        let (synth, _) = registry.select("auto", None, "en-US").unwrap();
        assert_eq!(synth.provider(), TtsProvider::GoogleTts);
    }

    #[test]
    fn test_auto_maps_foreign_voice_through_equivalence() {
        // Adam exists only on ElevenLabs; Google wins on cost and receives
        // the mapped Neural2-D
        let registry = registry_with_keys();
        let (synth, voice) = registry
            .select("auto", Some("pNInz6obpgDQGcFmaJgB"), "en-US")
            .unwrap();
        assert_eq!(synth.provider(), TtsProvider::GoogleTts);
        assert_eq!(voice, "en-US-Neural2-D");
    }

    #[test]
    fn test_auto_unsupported_language() {
        let registry = registry_with_keys();
        let err = registry.select("auto", None, "ja-JP").unwrap_err();
        assert!(matches!(err, SzinkronError::UnsupportedLanguage(_)));
    }

    #[test]
    fn test_auto_without_any_configured_provider() {
        let registry = registry_without_keys();
        let err = registry.select("auto", None, "en-US").unwrap_err();
        assert!(matches!(err, SzinkronError::UnsupportedLanguage(_)));
        assert!(!registry.any_configured());
    }

    #[test]
    fn test_explicit_unconfigured_provider_rejected() {
        let registry = registry_without_keys();
        let err = registry.select("google_tts", None, "en-US").unwrap_err();
        assert!(matches!(err, SzinkronError::Config(_)));
    }

    #[test]
    fn test_invalid_provider_id() {
        let registry = registry_with_keys();
        let err = registry.select("acme_tts", None, "en-US").unwrap_err();
        assert!(matches!(err, SzinkronError::InvalidRequest(_)));
    }

    #[test]
    fn test_cost_comparison_ranked() {
        let registry = registry_with_keys();
        let rows = registry.cost_comparison(&"x".repeat(1000), "en-US");
        assert_eq!(rows.len(), 2);
        assert!(rows[0].cost_usd <= rows[1].cost_usd);
        assert_eq!(rows[0].provider, "google_tts");
    }

    #[test]
    fn test_summaries_cover_all_providers() {
        let registry = registry_without_keys();
        let summaries = registry.summaries();
        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| !s.configured));
        assert!(summaries.iter().all(|s| s.voices_count > 0));
    }
}
