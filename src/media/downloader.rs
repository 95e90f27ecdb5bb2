//! Media download via yt-dlp.
//!
//! Audio-only downloads for recognition and video-only downloads for muxing,
//! so neither path pulls more bytes than it needs.

use super::process::run_with_deadline;
use crate::error::{Result, SzinkronError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Metadata probed from the source before any download.
#[derive(Debug, Clone)]
pub struct MediaMetadata {
    pub video_id: String,
    pub title: String,
    pub duration_seconds: Option<u32>,
    pub uploader: Option<String>,
}

/// Probe source metadata without downloading.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_metadata(url: &str, deadline: Duration) -> Result<MediaMetadata> {
    let out = run_with_deadline(
        "yt-dlp",
        &["--dump-json", "--no-download", "--no-warnings", "--no-playlist", url],
        deadline,
    )
    .await?;

    if !out.success() {
        return Err(SzinkronError::SourceUnavailable(format!(
            "Metadata probe failed: {}",
            out.stderr_tail()
        )));
    }

    let json: serde_json::Value = serde_json::from_str(&out.stdout)
        .map_err(|e| SzinkronError::SourceUnavailable(format!("Unparseable metadata: {}", e)))?;

    Ok(MediaMetadata {
        video_id: json["id"].as_str().unwrap_or("unknown").to_string(),
        title: json["title"].as_str().unwrap_or("Unknown").to_string(),
        duration_seconds: json["duration"].as_f64().map(|d| d as u32),
        uploader: json["uploader"].as_str().map(|s| s.to_string()),
    })
}

/// Download the best audio stream into `output_dir`.
///
/// In test mode only the first 60 seconds are kept, trimmed with a stream
/// copy after the download.
#[instrument(skip(output_dir), fields(video_id = %video_id))]
pub async fn download_audio(
    url: &str,
    video_id: &str,
    output_dir: &Path,
    test_mode: bool,
    deadline: Duration,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;

    let template = output_dir.join(format!("audio_{}.%(ext)s", video_id));
    let template_str = template.to_string_lossy().into_owned();

    info!("Downloading audio stream");
    let out = run_with_deadline(
        "yt-dlp",
        &[
            "--format",
            "bestaudio[ext=m4a]/bestaudio",
            "--output",
            &template_str,
            "--no-playlist",
            "--quiet",
            "--no-warnings",
            url,
        ],
        deadline,
    )
    .await?;

    if !out.success() {
        return Err(SzinkronError::SourceUnavailable(format!(
            "Audio download failed: {}",
            out.stderr_tail()
        )));
    }

    let downloaded = find_downloaded(output_dir, &format!("audio_{}", video_id))?;

    if test_mode {
        debug!("Test mode: trimming audio to 60 seconds");
        let trimmed = trim_to_test_window(&downloaded).await?;
        if trimmed != downloaded {
            let _ = tokio::fs::remove_file(&downloaded).await;
            return Ok(trimmed);
        }
    }

    Ok(downloaded)
}

/// Download the video stream only (no audio) for muxing.
#[instrument(skip(output_dir))]
pub async fn download_video_only(
    url: &str,
    video_id: &str,
    output_dir: &Path,
    deadline: Duration,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;

    let template = output_dir.join(format!("video_{}.%(ext)s", video_id));
    let template_str = template.to_string_lossy().into_owned();

    info!("Downloading video-only stream");
    let out = run_with_deadline(
        "yt-dlp",
        &[
            "--format",
            "bv[ext=mp4]/best[ext=mp4]/bv/best",
            "--output",
            &template_str,
            "--no-playlist",
            "--quiet",
            "--no-warnings",
            url,
        ],
        deadline,
    )
    .await?;

    if !out.success() {
        return Err(SzinkronError::SourceUnavailable(format!(
            "Video download failed: {}",
            out.stderr_tail()
        )));
    }

    find_downloaded(output_dir, &format!("video_{}", video_id))
}

/// Locate a downloaded file by its stem; yt-dlp chooses the extension.
fn find_downloaded(dir: &Path, stem: &str) -> Result<PathBuf> {
    for ext in &["m4a", "mp4", "webm", "opus", "mp3", "ogg", "mkv"] {
        let candidate = dir.join(format!("{}.{}", stem, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }

    // Fallback: scan directory for matching prefix
    let entries = std::fs::read_dir(dir)
        .map_err(|e| SzinkronError::SourceUnavailable(format!("Cannot read directory: {}", e)))?;
    for entry in entries.flatten() {
        if entry.file_name().to_string_lossy().starts_with(stem) {
            return Ok(entry.path());
        }
    }

    Err(SzinkronError::SourceUnavailable(
        "Downloaded file not found".into(),
    ))
}

/// Trim audio to the 60-second test window with a stream copy.
async fn trim_to_test_window(input: &Path) -> Result<PathBuf> {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("audio");
    let ext = input.extension().and_then(|s| s.to_str()).unwrap_or("m4a");
    let output = input.with_file_name(format!("{}_60s.{}", stem, ext));

    let input_str = input.to_string_lossy().into_owned();
    let output_str = output.to_string_lossy().into_owned();

    let out = run_with_deadline(
        "ffmpeg",
        &["-y", "-i", &input_str, "-t", "60", "-c", "copy", &output_str],
        Duration::from_secs(120),
    )
    .await?;

    if out.success() && output.exists() {
        Ok(output)
    } else {
        // A failed trim is not fatal; recognition just processes the full file.
        Ok(input.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_downloaded_prefers_known_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("audio_abc.webm"), b"x").unwrap();
        std::fs::write(dir.path().join("audio_abc.m4a"), b"x").unwrap();

        let found = find_downloaded(dir.path(), "audio_abc").unwrap();
        assert_eq!(found.extension().unwrap(), "m4a");
    }

    #[test]
    fn test_find_downloaded_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_downloaded(dir.path(), "audio_missing").is_err());
    }
}
