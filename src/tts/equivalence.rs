//! Cross-provider voice equivalence.
//!
//! A static table maps popular voices between providers; misses fall back
//! to a deterministic nearest-voice search over the target catalog.

use super::{language_matches, TtsProvider, VoiceProfile};

/// Popular ElevenLabs voices and their Google equivalents.
const PAIRS: &[(&str, &str)] = &[
    ("21m00Tcm4TlvDq8ikWAM", "en-US-Neural2-F"), // Rachel: female, clear
    ("pNInz6obpgDQGcFmaJgB", "en-US-Neural2-D"), // Adam: male, deep
    ("yoZ06aMxZJJ28mfd3POQ", "en-US-Neural2-A"), // Sam: male, conversational
    ("piTKgcLEGmPE4e6mEKli", "en-US-Neural2-E"), // Nicole: female, warm
    ("TxGEqnHWrfWFTfGW9XjX", "en-US-Neural2-C"), // Josh: male, professional
    ("EXAVITQu4vr4xnSDxMaL", "en-US-Neural2-G"), // Bella: female, professional
    ("ThT5KcBeYPX3keUQqHPh", "en-GB-Neural2-A"), // Dorothy: British female
    ("ErXwobaYiN019PkySvjV", "en-US-Neural2-J"), // Antoni: male, versatile
];

/// Preferred equivalent of a voice on another provider.
///
/// Reflexive on identity; returns None on a table miss (callers then run
/// [`nearest_voice`] over the target catalog).
pub fn equivalent_voice(
    from: TtsProvider,
    voice_id: &str,
    to: TtsProvider,
) -> Option<String> {
    if from == to {
        return Some(voice_id.to_string());
    }

    match (from, to) {
        (TtsProvider::Elevenlabs, TtsProvider::GoogleTts) => PAIRS
            .iter()
            .find(|(el, _)| *el == voice_id)
            .map(|(_, g)| g.to_string()),
        (TtsProvider::GoogleTts, TtsProvider::Elevenlabs) => PAIRS
            .iter()
            .find(|(_, g)| *g == voice_id)
            .map(|(el, _)| el.to_string()),
        _ => None,
    }
}

/// Deterministic nearest-voice search: same language is required, then
/// candidates are ranked by gender match, quality-tier match, and tone-tag
/// match, with lower price breaking ties.
pub fn nearest_voice<'a>(
    reference: &VoiceProfile,
    candidates: &'a [VoiceProfile],
) -> Option<&'a VoiceProfile> {
    candidates
        .iter()
        .filter(|c| language_matches(&c.language, &reference.language))
        .min_by(|a, b| {
            rank(reference, a)
                .cmp(&rank(reference, b))
                .then(a.price_per_1k_chars.total_cmp(&b.price_per_1k_chars))
        })
}

/// Lower ranks are better matches.
fn rank(reference: &VoiceProfile, candidate: &VoiceProfile) -> (u8, u8, u8) {
    let gender = u8::from(candidate.gender != reference.gender);
    let tier = u8::from(candidate.tier != reference.tier);
    let tone = u8::from(
        reference.tone.is_some() && candidate.tone != reference.tone,
    );
    (gender, tier, tone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tts::{Gender, VoiceTier};

    fn profile(
        provider: TtsProvider,
        voice_id: &str,
        language: &str,
        gender: Gender,
        tier: VoiceTier,
        tone: Option<&str>,
        price: f64,
    ) -> VoiceProfile {
        VoiceProfile {
            provider,
            voice_id: voice_id.to_string(),
            name: voice_id.to_string(),
            language: language.to_string(),
            gender: Some(gender),
            tier,
            tone: tone.map(|t| t.to_string()),
            price_per_1k_chars: price,
        }
    }

    #[test]
    fn test_equivalence_is_reflexive_on_identity() {
        let id = "whatever-voice-id";
        assert_eq!(
            equivalent_voice(TtsProvider::Elevenlabs, id, TtsProvider::Elevenlabs),
            Some(id.to_string())
        );
        assert_eq!(
            equivalent_voice(TtsProvider::GoogleTts, id, TtsProvider::GoogleTts),
            Some(id.to_string())
        );
    }

    #[test]
    fn test_table_maps_both_directions() {
        assert_eq!(
            equivalent_voice(
                TtsProvider::Elevenlabs,
                "pNInz6obpgDQGcFmaJgB",
                TtsProvider::GoogleTts
            ),
            Some("en-US-Neural2-D".to_string())
        );
        assert_eq!(
            equivalent_voice(
                TtsProvider::GoogleTts,
                "en-US-Neural2-D",
                TtsProvider::Elevenlabs
            ),
            Some("pNInz6obpgDQGcFmaJgB".to_string())
        );
    }

    #[test]
    fn test_table_miss_returns_none() {
        assert_eq!(
            equivalent_voice(TtsProvider::Elevenlabs, "unknown", TtsProvider::GoogleTts),
            None
        );
    }

    #[test]
    fn test_nearest_requires_language() {
        let reference = profile(
            TtsProvider::Elevenlabs,
            "ref",
            "hu-HU",
            Gender::Female,
            VoiceTier::Premium,
            None,
            0.30,
        );
        let candidates = vec![profile(
            TtsProvider::GoogleTts,
            "en-voice",
            "en-US",
            Gender::Female,
            VoiceTier::Premium,
            None,
            0.016,
        )];
        assert!(nearest_voice(&reference, &candidates).is_none());
    }

    #[test]
    fn test_nearest_prefers_gender_then_tier_then_tone() {
        let reference = profile(
            TtsProvider::Elevenlabs,
            "ref",
            "en-US",
            Gender::Female,
            VoiceTier::Premium,
            Some("warm"),
            0.30,
        );
        let candidates = vec![
            profile(
                TtsProvider::GoogleTts,
                "male-premium",
                "en-US",
                Gender::Male,
                VoiceTier::Premium,
                Some("warm"),
                0.016,
            ),
            profile(
                TtsProvider::GoogleTts,
                "female-standard",
                "en-US",
                Gender::Female,
                VoiceTier::Standard,
                Some("warm"),
                0.004,
            ),
            profile(
                TtsProvider::GoogleTts,
                "female-premium-bright",
                "en-US",
                Gender::Female,
                VoiceTier::Premium,
                Some("bright"),
                0.016,
            ),
            profile(
                TtsProvider::GoogleTts,
                "female-premium-warm",
                "en-US",
                Gender::Female,
                VoiceTier::Premium,
                Some("warm"),
                0.016,
            ),
        ];
        let best = nearest_voice(&reference, &candidates).unwrap();
        assert_eq!(best.voice_id, "female-premium-warm");
    }

    #[test]
    fn test_nearest_breaks_ties_by_price() {
        let reference = profile(
            TtsProvider::Elevenlabs,
            "ref",
            "en-US",
            Gender::Male,
            VoiceTier::Premium,
            None,
            0.30,
        );
        let candidates = vec![
            profile(
                TtsProvider::GoogleTts,
                "pricey",
                "en-US",
                Gender::Male,
                VoiceTier::Premium,
                None,
                0.020,
            ),
            profile(
                TtsProvider::GoogleTts,
                "cheap",
                "en-US",
                Gender::Male,
                VoiceTier::Premium,
                None,
                0.016,
            ),
        ];
        assert_eq!(nearest_voice(&reference, &candidates).unwrap().voice_id, "cheap");
    }
}
