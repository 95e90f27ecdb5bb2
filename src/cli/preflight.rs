//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and credentials are available before
//! starting operations that would otherwise fail midway.

use crate::config::Settings;
use crate::error::{Result, SzinkronError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Transcription needs the media tools and a speech credential.
    Transcribe,
    /// Translation needs a generative-API credential.
    Translate,
    /// Synthesis needs at least one TTS provider credential.
    Synthesize,
    /// Dubbing needs everything.
    Dub,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Transcribe => {
            check_tool("yt-dlp")?;
            check_tool("ffmpeg")?;
            check_tool("ffprobe")?;
            check_speech_credentials(settings)?;
        }
        Operation::Translate => {
            check_genai_credentials(settings)?;
        }
        Operation::Synthesize => {
            check_tts_credentials(settings)?;
        }
        Operation::Dub => {
            check(Operation::Transcribe, settings)?;
            check(Operation::Translate, settings)?;
            check(Operation::Synthesize, settings)?;
        }
    }
    Ok(())
}

fn check_speech_credentials(settings: &Settings) -> Result<()> {
    match settings.recognizer.access_token.as_deref() {
        Some(t) if !t.is_empty() => Ok(()),
        _ => Err(SzinkronError::Config(
            "GOOGLE_ACCESS_TOKEN not set. Export a speech-scoped access token.".to_string(),
        )),
    }
}

fn check_genai_credentials(settings: &Settings) -> Result<()> {
    if settings.genai.project.is_empty() {
        return Err(SzinkronError::Config(
            "GENAI_PROJECT not set. Configure the generative-API project id.".to_string(),
        ));
    }
    match settings.genai.access_token.as_deref() {
        Some(t) if !t.is_empty() => Ok(()),
        _ => Err(SzinkronError::Config(
            "GOOGLE_ACCESS_TOKEN not set for the generative API.".to_string(),
        )),
    }
}

fn check_tts_credentials(settings: &Settings) -> Result<()> {
    let has_any = settings
        .tts
        .elevenlabs_api_key
        .as_deref()
        .is_some_and(|k| !k.is_empty())
        || settings
            .tts
            .google_api_key
            .as_deref()
            .is_some_and(|k| !k.is_empty());
    if has_any {
        Ok(())
    } else {
        Err(SzinkronError::Config(
            "No TTS provider configured. Set ELEVENLABS_API_KEY or GOOGLE_TTS_API_KEY."
                .to_string(),
        ))
    }
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(SzinkronError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SzinkronError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(SzinkronError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tts_check_requires_any_key() {
        let mut settings = Settings::default();
        assert!(check_tts_credentials(&settings).is_err());
        settings.tts.google_api_key = Some("key".into());
        assert!(check_tts_credentials(&settings).is_ok());
    }

    #[test]
    fn test_genai_check_requires_project_and_token() {
        let mut settings = Settings::default();
        assert!(check_genai_credentials(&settings).is_err());
        settings.genai.project = "proj".into();
        assert!(check_genai_credentials(&settings).is_err());
        settings.genai.access_token = Some("token".into());
        assert!(check_genai_credentials(&settings).is_ok());
    }
}
