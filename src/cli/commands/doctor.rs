//! System diagnostics command.

use crate::cli::preflight::check_tool;
use crate::cli::Output;
use crate::config::Settings;
use crate::tts::ProviderRegistry;

/// Check tools, credentials, and configuration.
pub async fn run_doctor(settings: Settings) -> anyhow::Result<()> {
    Output::header("Szinkron doctor");
    let mut problems = 0;

    println!("\nExternal tools:");
    for tool in ["yt-dlp", "ffmpeg", "ffprobe"] {
        match check_tool(tool) {
            Ok(()) => Output::success(&format!("{} found", tool)),
            Err(e) => {
                Output::error(&format!("{}", e));
                problems += 1;
            }
        }
    }

    println!("\nCredentials:");
    match settings.recognizer.access_token.as_deref() {
        Some(t) if !t.is_empty() => Output::success("Speech access token configured"),
        _ => {
            Output::warning("GOOGLE_ACCESS_TOKEN not set (transcription unavailable)");
            problems += 1;
        }
    }
    if settings.genai.project.is_empty() {
        Output::warning("GENAI_PROJECT not set (post-editing and translation unavailable)");
        problems += 1;
    } else {
        Output::success(&format!("Generative project: {}", settings.genai.project));
    }

    let registry = ProviderRegistry::new(settings.tts.clone());
    let configured = registry.configured();
    if configured.is_empty() {
        Output::warning("No TTS provider configured (synthesis unavailable)");
        problems += 1;
    } else {
        for provider in configured {
            Output::success(&format!("TTS provider ready: {}", provider.provider()));
        }
    }

    println!("\nConfiguration:");
    Output::kv("Data dir", &settings.data_dir().display().to_string());
    Output::kv("Temp dir", &settings.temp_dir().display().to_string());
    Output::kv("Language", &settings.recognizer.language_code);
    Output::kv(
        "Sync limit",
        &format!("{} MB", settings.recognizer.sync_size_limit_mb),
    );
    Output::kv(
        "Workers",
        &settings.jobs.max_concurrent_jobs.to_string(),
    );
    match settings.jobs.max_cost_usd {
        Some(cap) => Output::kv("Cost cap", &format!("${:.2}/job", cap)),
        None => Output::kv("Cost cap", "unbounded"),
    }

    println!();
    if problems == 0 {
        Output::success("All checks passed.");
    } else {
        Output::warning(&format!("{} problem(s) found.", problems));
    }

    Ok(())
}
