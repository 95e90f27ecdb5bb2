//! Audio decoding and probing via ffmpeg/ffprobe.

use super::process::run_with_deadline;
use crate::error::{Result, SzinkronError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Probed properties of an audio stream.
#[derive(Debug, Clone)]
pub struct AudioInfo {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u32,
}

/// Decode an audio file to FLAC at the recognizer's required rate/channels.
#[instrument(skip_all, fields(input = %input.display()))]
pub async fn to_flac(input: &Path, sample_rate: u32, channels: u32) -> Result<PathBuf> {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("audio");
    let output = input.with_file_name(format!("{}_decoded.flac", stem));

    let input_str = input.to_string_lossy().into_owned();
    let output_str = output.to_string_lossy().into_owned();
    let ar = sample_rate.to_string();
    let ac = channels.to_string();

    info!("Decoding to FLAC {}Hz {}ch", sample_rate, channels);
    let out = run_with_deadline(
        "ffmpeg",
        &[
            "-y", "-i", &input_str, "-ac", &ac, "-ar", &ar, "-vn", &output_str,
        ],
        Duration::from_secs(600),
    )
    .await?;

    if !out.success() {
        return Err(SzinkronError::ToolFailed(format!(
            "ffmpeg decode failed: {}",
            out.stderr_tail()
        )));
    }

    debug!("Decoded to {}", output.display());
    Ok(output)
}

/// Probe a media file's duration in seconds.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let path_str = path.to_string_lossy().into_owned();
    let out = run_with_deadline(
        "ffprobe",
        &[
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
            &path_str,
        ],
        Duration::from_secs(30),
    )
    .await?;

    if !out.success() {
        return Err(SzinkronError::ToolFailed(format!(
            "ffprobe failed: {}",
            out.stderr_tail()
        )));
    }

    out.stdout
        .trim()
        .parse::<f64>()
        .map_err(|_| SzinkronError::ToolFailed("ffprobe returned no duration".into()))
}

/// Probe an audio file's stream properties.
pub async fn probe_audio_info(path: &Path) -> Result<AudioInfo> {
    let path_str = path.to_string_lossy().into_owned();
    let out = run_with_deadline(
        "ffprobe",
        &[
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            &path_str,
        ],
        Duration::from_secs(30),
    )
    .await?;

    if !out.success() {
        return Err(SzinkronError::ToolFailed(format!(
            "ffprobe failed: {}",
            out.stderr_tail()
        )));
    }

    let probe: serde_json::Value = serde_json::from_str(&out.stdout)?;
    let stream = probe["streams"]
        .as_array()
        .and_then(|ss| {
            ss.iter()
                .find(|s| s["codec_type"].as_str() == Some("audio"))
        })
        .ok_or_else(|| SzinkronError::ToolFailed("No audio stream found".into()))?;

    let duration = probe["format"]["duration"]
        .as_str()
        .and_then(|d| d.parse().ok())
        .unwrap_or(0.0);

    Ok(AudioInfo {
        duration_seconds: duration,
        sample_rate: stream["sample_rate"]
            .as_str()
            .and_then(|r| r.parse().ok())
            .unwrap_or(0),
        channels: stream["channels"].as_u64().unwrap_or(0) as u32,
    })
}

/// Append trailing silence so the audio reaches `target_seconds`.
///
/// Used by timing reconciliation when synthesized audio runs shorter than
/// the source span. Never trims.
pub async fn pad_with_silence(input: &Path, target_seconds: f64) -> Result<PathBuf> {
    let current = probe_duration(input).await?;
    if current >= target_seconds {
        return Ok(input.to_path_buf());
    }

    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("audio");
    let ext = input.extension().and_then(|s| s.to_str()).unwrap_or("mp3");
    let output = input.with_file_name(format!("{}_padded.{}", stem, ext));

    let input_str = input.to_string_lossy().into_owned();
    let output_str = output.to_string_lossy().into_owned();
    let pad_arg = format!("apad=whole_dur={:.3}", target_seconds);

    info!(
        "Padding audio with {:.1}s of silence",
        target_seconds - current
    );
    let out = run_with_deadline(
        "ffmpeg",
        &["-y", "-i", &input_str, "-af", &pad_arg, &output_str],
        Duration::from_secs(300),
    )
    .await?;

    if !out.success() {
        return Err(SzinkronError::ToolFailed(format!(
            "ffmpeg pad failed: {}",
            out.stderr_tail()
        )));
    }

    Ok(output)
}

/// Re-encode audio into a different container, used once at chunk-stitch
/// boundaries when the requested format does not concatenate natively.
pub async fn recode_audio(input: &Path, target_ext: &str) -> Result<PathBuf> {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("audio");
    let output = input.with_file_name(format!("{}.{}", stem, target_ext));

    let input_str = input.to_string_lossy().into_owned();
    let output_str = output.to_string_lossy().into_owned();

    let out = run_with_deadline(
        "ffmpeg",
        &["-y", "-i", &input_str, &output_str],
        Duration::from_secs(600),
    )
    .await?;

    if !out.success() {
        return Err(SzinkronError::ToolFailed(format!(
            "ffmpeg recode failed: {}",
            out.stderr_tail()
        )));
    }

    Ok(output)
}
