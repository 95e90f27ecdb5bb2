//! Voice listing command.

use crate::cli::Output;
use crate::config::Settings;
use crate::tts::{ProviderRegistry, TtsProvider};

/// List the voices of a TTS provider.
pub async fn run_voices(
    provider: String,
    language: Option<String>,
    settings: Settings,
) -> anyhow::Result<()> {
    let provider: TtsProvider = provider
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let registry = ProviderRegistry::new(settings.tts);
    registry.refresh_catalogs().await;

    let synth = registry
        .get(provider)
        .ok_or_else(|| anyhow::anyhow!("Unknown provider"))?;

    let voices = synth.list_voices(language.as_deref());
    Output::header(&format!("{} voices", provider));
    if voices.is_empty() {
        Output::warning("No voices match the filter.");
        return Ok(());
    }

    for voice in &voices {
        let gender = voice
            .gender
            .map(|g| format!("{:?}", g).to_lowercase())
            .unwrap_or_else(|| "-".to_string());
        Output::list_item(&format!(
            "{} ({}, {}, {:?}, ${:.3}/1k)",
            voice.voice_id, voice.language, gender, voice.tier, voice.price_per_1k_chars
        ));
    }
    println!();
    Output::kv("Total", &voices.len().to_string());

    Ok(())
}
