//! Interactive dubbing command.
//!
//! Prompts for the pipeline parameters in a fixed order and submits the
//! resulting request; the request shape is exactly the HTTP dub body.

use super::watch_job;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{auto_detect_order, model_description, Settings, TranslationContext};
use crate::error::SzinkronError;
use crate::genai::supported_languages;
use crate::ids;
use crate::jobs::{
    JobKind, JobRequest, PostEditOptions, SynthesisOptions, TranslationOptions,
};
use crate::orchestrator::Orchestrator;
use console::style;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Run the interactive dubbing wizard.
pub async fn run_dub(settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Transcribe, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'szinkron doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    println!("\n{}", style("Szinkron Dubbing").bold().cyan());
    println!(
        "{}\n",
        style("Answer the prompts to configure the pipeline. Enter keeps the default.").dim()
    );

    let stdin = io::stdin();
    let mut lines = stdin.lock();
    let request = build_request(&mut lines, &settings)?;

    let orchestrator = Arc::new(Orchestrator::new(settings)?);
    orchestrator.providers().refresh_catalogs().await;

    let id = Arc::clone(&orchestrator).submit(JobKind::Dub, request)?;
    Output::info(&format!("Dubbing job {} started", id.short()));

    watch_job(&orchestrator, &id).await
}

/// Collect the dub request field by field. The prompt order is fixed.
fn build_request<R: BufRead>(
    input: &mut R,
    settings: &Settings,
) -> Result<JobRequest, SzinkronError> {
    // 1. URL
    let url = loop {
        let raw = prompt(input, "Video URL", None)?;
        if ids::is_valid_video_url(&raw) {
            break raw;
        }
        Output::error("Unsupported video URL, try again.");
    };

    // 2-3. test mode, breath detection
    let test_mode = prompt_bool(input, "Test mode (first 60 seconds only)?", false)?;
    let breath_detection = prompt_bool(input, "Annotate breaths and pauses?", true)?;

    // 4-5. post-edit and its model
    let post_edit = prompt_bool(input, "Post-edit the script with the generative model?", false)?;
    let model = if post_edit {
        println!("  Available models:");
        Output::list_item(&format!("auto - {}", model_description("auto")));
        for m in auto_detect_order() {
            Output::list_item(&format!("{} - {}", m, model_description(&m)));
        }
        Some(prompt(input, "Model", Some("auto"))?)
    } else {
        None
    };

    // 6-10. translation parameters
    let translate = prompt_bool(input, "Translate the script?", false)?;
    let translation = if translate {
        println!("  Common target languages:");
        for (code, name) in supported_languages().iter().take(6) {
            Output::list_item(&format!("{} - {}", code, name));
        }
        let target_language = prompt(
            input,
            "Target language",
            Some(&settings.translation.default_target_language),
        )?;

        println!("  Contexts:");
        for ctx in TranslationContext::all() {
            Output::list_item(ctx.as_str());
        }
        let context: TranslationContext = prompt(
            input,
            "Context",
            Some(&settings.translation.default_context),
        )?
        .parse()
        .map_err(SzinkronError::InvalidRequest)?;

        let audience = prompt(
            input,
            "Target audience",
            Some(&settings.translation.default_audience),
        )?;
        let tone = prompt(input, "Desired tone", Some(&settings.translation.default_tone))?;

        TranslationOptions {
            enabled: true,
            target_language,
            context,
            audience,
            tone,
            quality: "balanced".to_string(),
        }
    } else {
        TranslationOptions::default()
    };

    // 11-12. TTS provider and voice
    let synthesize = prompt_bool(input, "Synthesize new audio?", false)?;
    let synthesis = if synthesize {
        let provider = prompt(
            input,
            "TTS provider (elevenlabs, google_tts, auto)",
            Some(&settings.tts.default_provider),
        )?;
        let voice = prompt(input, "Voice id (empty for automatic)", Some(""))?;
        SynthesisOptions {
            enabled: true,
            provider,
            voice_id: if voice.is_empty() { None } else { Some(voice) },
            ..Default::default()
        }
    } else {
        SynthesisOptions::default()
    };

    // 13. mux
    let mux = if synthesis.enabled {
        prompt_bool(input, "Remux the dubbed audio into the video?", false)?
    } else {
        false
    };

    Ok(JobRequest {
        url: Some(url),
        test_mode,
        breath_detection,
        language: None,
        transcript: None,
        post_edit: PostEditOptions {
            enabled: post_edit,
            model,
        },
        translation,
        synthesis,
        mux,
        max_cost_usd: settings.jobs.max_cost_usd,
    })
}

fn prompt<R: BufRead>(
    input: &mut R,
    label: &str,
    default: Option<&str>,
) -> Result<String, SzinkronError> {
    match default {
        Some(d) if !d.is_empty() => print!("{} [{}]: ", style(label).bold(), d),
        _ => print!("{}: ", style(label).bold()),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();

    if answer.is_empty() {
        Ok(default.unwrap_or_default().to_string())
    } else {
        Ok(answer.to_string())
    }
}

fn prompt_bool<R: BufRead>(
    input: &mut R,
    label: &str,
    default: bool,
) -> Result<bool, SzinkronError> {
    let hint = if default { "Y/n" } else { "y/N" };
    let answer = prompt(input, &format!("{} [{}]", label, hint), Some(""))?;
    Ok(match answer.to_lowercase().as_str() {
        "y" | "yes" | "i" => true,
        "n" | "no" => false,
        _ => default,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_wizard_minimal_flow() {
        // URL, then all defaults
        let answers = "https://youtu.be/dQw4w9WgXcQ\n\n\n\n\n\n";
        let mut input = Cursor::new(answers);
        let request = build_request(&mut input, &Settings::default()).unwrap();

        assert_eq!(request.url.as_deref(), Some("https://youtu.be/dQw4w9WgXcQ"));
        assert!(!request.test_mode);
        assert!(request.breath_detection);
        assert!(!request.post_edit.enabled);
        assert!(!request.translation.enabled);
        assert!(!request.synthesis.enabled);
        assert!(!request.mux);
    }

    #[test]
    fn test_wizard_full_flow_fixed_order() {
        let answers = concat!(
            "https://youtu.be/dQw4w9WgXcQ\n", // URL
            "y\n",                            // test mode
            "n\n",                            // breath detection
            "y\n",                            // post-edit
            "gemini-2.0-flash\n",             // post-edit model
            "y\n",                            // translation
            "en-US\n",                        // target language
            "spiritual\n",                    // context
            "meditators\n",                   // audience
            "uplifting\n",                    // tone
            "y\n",                            // synthesis
            "google_tts\n",                   // provider
            "en-US-Neural2-F\n",              // voice
            "y\n",                            // mux
        );
        let mut input = Cursor::new(answers);
        let request = build_request(&mut input, &Settings::default()).unwrap();

        assert!(request.test_mode);
        assert!(!request.breath_detection);
        assert!(request.post_edit.enabled);
        assert_eq!(request.post_edit.model.as_deref(), Some("gemini-2.0-flash"));
        assert!(request.translation.enabled);
        assert_eq!(request.translation.target_language, "en-US");
        assert_eq!(request.translation.context, TranslationContext::Spiritual);
        assert_eq!(request.translation.audience, "meditators");
        assert_eq!(request.translation.tone, "uplifting");
        assert!(request.synthesis.enabled);
        assert_eq!(request.synthesis.provider, "google_tts");
        assert_eq!(request.synthesis.voice_id.as_deref(), Some("en-US-Neural2-F"));
        assert!(request.mux);
    }

    #[test]
    fn test_wizard_retries_bad_url() {
        let answers = "not-a-url\nhttps://youtu.be/dQw4w9WgXcQ\n\n\n\n\n\n";
        let mut input = Cursor::new(answers);
        let request = build_request(&mut input, &Settings::default()).unwrap();
        assert_eq!(request.url.as_deref(), Some("https://youtu.be/dQw4w9WgXcQ"));
    }
}
