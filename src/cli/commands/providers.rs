//! Provider comparison command.

use crate::cli::Output;
use crate::config::Settings;
use crate::tts::ProviderRegistry;

/// Compare TTS provider costs for a sample text.
pub async fn run_providers(text: Option<String>, settings: Settings) -> anyhow::Result<()> {
    let language = settings.translation.default_target_language.clone();
    let registry = ProviderRegistry::new(settings.tts);
    registry.refresh_catalogs().await;

    Output::header("TTS providers");
    for summary in registry.summaries() {
        let status = if summary.configured { "ready" } else { "not configured" };
        Output::list_item(&format!(
            "{} ({}; {} voices; ${:.3}/1k; {} languages)",
            summary.id,
            status,
            summary.voices_count,
            summary.rate_per_1k,
            summary.languages.len()
        ));
    }

    let sample = text.unwrap_or_else(|| "x".repeat(1000));
    let rows = registry.cost_comparison(&sample, &language);
    if rows.is_empty() {
        println!();
        Output::warning("No configured provider can quote the sample.");
        return Ok(());
    }

    println!();
    Output::header(&format!("Cost for {} characters", sample.chars().count()));
    for row in &rows {
        Output::list_item(&format!(
            "{}: ${:.4} (voice {})",
            row.provider, row.cost_usd, row.voice_id
        ));
    }
    println!();
    Output::success(&format!("Cheapest: {}", rows[0].provider));

    Ok(())
}
