//! Video muxing: replace the audio track of a video with synthesized audio.

use super::converter::{probe_audio_info, probe_duration};
use super::downloader::download_video_only;
use super::process::run_with_deadline;
use crate::error::{Result, SzinkronError};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Result of a successful mux.
#[derive(Debug, Clone)]
pub struct MuxResult {
    pub video_path: PathBuf,
    pub duration_seconds: f64,
    pub file_size_bytes: u64,
    pub format: String,
}

/// Fetch the original video stream and mux the new audio against it.
///
/// The video stream is copied without re-encoding; audio is encoded to AAC.
/// Output is truncated to the shorter of the two streams.
#[instrument(skip_all, fields(url = %video_url))]
pub async fn replace_audio(
    video_url: &str,
    video_id: &str,
    audio_path: &Path,
    output_path: &Path,
    temp_dir: &Path,
    format: &str,
    download_deadline: Duration,
    mux_deadline: Duration,
) -> Result<MuxResult> {
    let video_path = if Path::new(video_url).is_file() {
        PathBuf::from(video_url)
    } else {
        download_video_only(video_url, video_id, temp_dir, download_deadline).await?
    };

    if !audio_path.exists() {
        return Err(SzinkronError::Internal(format!(
            "Synthesized audio missing: {}",
            audio_path.display()
        )));
    }

    let video_duration = probe_duration(&video_path).await?;
    let audio_info = probe_audio_info(audio_path).await?;
    info!(
        "Muxing video {:.1}s with audio {:.1}s",
        video_duration, audio_info.duration_seconds
    );
    if audio_info.duration_seconds < video_duration * 0.8 {
        warn!(
            "Audio significantly shorter than video ({:.1}s vs {:.1}s)",
            audio_info.duration_seconds, video_duration
        );
    }

    let result = mux(&video_path, audio_path, output_path, format, mux_deadline).await;

    // The fetched video stream is scratch either way.
    if video_path != Path::new(video_url) {
        let _ = tokio::fs::remove_file(&video_path).await;
    }

    result
}

async fn mux(
    video_path: &Path,
    audio_path: &Path,
    output_path: &Path,
    format: &str,
    deadline: Duration,
) -> Result<MuxResult> {
    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let video_str = video_path.to_string_lossy().into_owned();
    let audio_str = audio_path.to_string_lossy().into_owned();
    let output_str = output_path.to_string_lossy().into_owned();

    let mut args: Vec<&str> = vec![
        "-y",
        "-i",
        &video_str,
        "-i",
        &audio_str,
        "-c:v",
        "copy",
        "-c:a",
        "aac",
        "-b:a",
        "128k",
        "-ac",
        "2",
        "-ar",
        "44100",
        "-map",
        "0:v:0",
        "-map",
        "1:a:0",
        "-shortest",
        "-avoid_negative_ts",
        "make_zero",
    ];
    if format == "mp4" {
        args.extend_from_slice(&["-movflags", "+faststart"]);
    }
    args.push(&output_str);

    let out = run_with_deadline("ffmpeg", &args, deadline).await?;

    if !out.success() {
        return Err(SzinkronError::MuxerFailed {
            exit_code: out.exit_code,
            stderr_tail: out.stderr_tail(),
        });
    }

    if !output_path.exists() {
        return Err(SzinkronError::MuxerFailed {
            exit_code: 0,
            stderr_tail: "Output file was not created".into(),
        });
    }

    let duration = probe_duration(output_path).await?;
    let file_size = tokio::fs::metadata(output_path).await?.len();

    Ok(MuxResult {
        video_path: output_path.to_path_buf(),
        duration_seconds: duration,
        file_size_bytes: file_size,
        format: format.to_string(),
    })
}
