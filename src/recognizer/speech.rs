//! Remote speech recognition client.
//!
//! Small inputs go through the synchronous `speech:recognize` call with the
//! audio inlined; larger inputs are uploaded to the object store and run
//! through `speech:longrunningrecognize` with operation polling.

use super::{use_staged_path, ProgressFn, Recognizer, RecognizerHit};
use crate::config::RecognizerSettings;
use crate::error::{Result, SzinkronError};
use crate::jobs::CancelToken;
use async_trait::async_trait;
use base64::Engine;
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

const SPEECH_BASE: &str = "https://speech.googleapis.com/v1";
const STORAGE_BASE: &str = "https://storage.googleapis.com";

/// Google Cloud Speech recognizer.
pub struct SpeechRecognizer {
    client: reqwest::Client,
    settings: RecognizerSettings,
}

impl SpeechRecognizer {
    pub fn new(settings: RecognizerSettings) -> Self {
        Self {
            client: crate::http::create_client(),
            settings,
        }
    }

    fn token(&self) -> Result<&str> {
        self.settings
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SzinkronError::Config(
                    "GOOGLE_ACCESS_TOKEN not configured for speech recognition".into(),
                )
            })
    }

    fn recognition_config(&self, language: &str) -> serde_json::Value {
        json!({
            "encoding": "FLAC",
            "sampleRateHertz": self.settings.sample_rate,
            "audioChannelCount": self.settings.channels,
            "languageCode": language,
            "enableAutomaticPunctuation": true,
            "enableWordTimeOffsets": true,
            "enableWordConfidence": true,
        })
    }

    /// Synchronous path: audio content inlined in the request.
    async fn recognize_sync(
        &self,
        audio_path: &Path,
        language: &str,
    ) -> Result<Vec<RecognizerHit>> {
        debug!("Synchronous recognition");
        let bytes = tokio::fs::read(audio_path).await?;
        let content = base64::engine::general_purpose::STANDARD.encode(&bytes);

        let body = json!({
            "config": self.recognition_config(language),
            "audio": { "content": content },
        });

        let response = self.call_with_quota_retry(|| {
            self.client
                .post(format!("{}/speech:recognize", SPEECH_BASE))
                .bearer_auth(self.token().unwrap_or_default())
                .json(&body)
        })
        .await?;

        parse_hits(&response)
    }

    /// Staged path: upload, start the long-running operation, poll.
    async fn recognize_staged(
        &self,
        audio_path: &Path,
        language: &str,
        progress: ProgressFn<'_>,
        cancel: &CancelToken,
    ) -> Result<Vec<RecognizerHit>> {
        let object_name = format!(
            "audio/{}",
            audio_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("audio.flac")
        );
        let uri = self.upload_to_store(audio_path, &object_name).await?;
        info!("Uploaded staged audio to {}", uri);

        let result = self
            .run_long_operation(&uri, language, audio_path, progress, cancel)
            .await;

        // the staged object is scratch regardless of outcome
        if let Err(e) = self.delete_from_store(&object_name).await {
            warn!("Failed to delete staged object {}: {}", object_name, e);
        }

        result
    }

    async fn run_long_operation(
        &self,
        uri: &str,
        language: &str,
        audio_path: &Path,
        progress: ProgressFn<'_>,
        cancel: &CancelToken,
    ) -> Result<Vec<RecognizerHit>> {
        let body = json!({
            "config": self.recognition_config(language),
            "audio": { "uri": uri },
        });

        let started: serde_json::Value = self
            .call_with_quota_retry(|| {
                self.client
                    .post(format!("{}/speech:longrunningrecognize", SPEECH_BASE))
                    .bearer_auth(self.token().unwrap_or_default())
                    .json(&body)
            })
            .await?;

        let op_name = started["name"]
            .as_str()
            .ok_or_else(|| {
                SzinkronError::TransientRemote("Recognizer returned no operation name".into())
            })?
            .to_string();
        info!("Long-running recognition started: {}", op_name);

        // roughly a minute of processing per MB, bounded
        let size_mb = tokio::fs::metadata(audio_path).await?.len() as f64 / (1024.0 * 1024.0);
        let expected = (size_mb * 60.0).clamp(60.0, 300.0);
        let start = Instant::now();
        let mut interval = 2.0f64;

        loop {
            if cancel.is_cancelled() {
                return Err(SzinkronError::Cancelled);
            }

            let op: serde_json::Value = self
                .call_with_quota_retry(|| {
                    self.client
                        .get(format!("{}/operations/{}", SPEECH_BASE, op_name))
                        .bearer_auth(self.token().unwrap_or_default())
                })
                .await?;

            if op["done"].as_bool() == Some(true) {
                progress(100);
                if let Some(err) = op.get("error").filter(|e| !e.is_null()) {
                    return Err(SzinkronError::TransientRemote(format!(
                        "Recognition operation failed: {}",
                        err
                    )));
                }
                return parse_hits(&op["response"]);
            }

            let elapsed = start.elapsed().as_secs_f64();
            let estimated = ((elapsed / expected) * 100.0).min(90.0) as u8;
            let reported = op["metadata"]["progressPercent"]
                .as_u64()
                .map(|p| (p as u8).min(90))
                .unwrap_or(estimated);
            progress(reported);

            // jittered, increasing poll interval
            let jitter = rand::rng().random_range(0.8..1.2);
            tokio::time::sleep(Duration::from_secs_f64(interval * jitter)).await;
            interval = (interval * 1.5).min(15.0);
        }
    }

    async fn upload_to_store(&self, path: &Path, object_name: &str) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            STORAGE_BASE, self.settings.bucket, object_name
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token()?)
            .header("Content-Type", "audio/flac")
            .body(bytes)
            .send()
            .await
            .map_err(|e| SzinkronError::TransientNetwork(format!("Upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_remote_error(status, &body));
        }

        Ok(format!("gs://{}/{}", self.settings.bucket, object_name))
    }

    async fn delete_from_store(&self, object_name: &str) -> Result<()> {
        let encoded = object_name.replace('/', "%2F");
        let url = format!(
            "{}/storage/v1/b/{}/o/{}",
            STORAGE_BASE, self.settings.bucket, encoded
        );
        self.client
            .delete(&url)
            .bearer_auth(self.token()?)
            .send()
            .await
            .map_err(|e| SzinkronError::TransientNetwork(format!("Delete failed: {}", e)))?;
        Ok(())
    }

    /// Issue a request, retrying quota refusals with exponential backoff up
    /// to the configured attempt budget.
    async fn call_with_quota_retry<F>(&self, build: F) -> Result<serde_json::Value>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0u32;
        loop {
            let result = build().send().await;
            let response = match result {
                Ok(r) => r,
                Err(e) => {
                    return Err(SzinkronError::TransientNetwork(format!(
                        "Recognizer request failed: {}",
                        e
                    )));
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response.json().await?);
            }

            let body = response.text().await.unwrap_or_default();
            let err = map_remote_error(status, &body);

            if matches!(err, SzinkronError::QuotaExceeded(_))
                && attempt < self.settings.quota_retry_attempts
            {
                attempt += 1;
                let backoff = 2u64.pow(attempt);
                let jitter = rand::rng().random_range(0.8..1.2);
                warn!(
                    "Recognizer quota exhausted, retry {}/{} in ~{}s",
                    attempt, self.settings.quota_retry_attempts, backoff
                );
                tokio::time::sleep(Duration::from_secs_f64(backoff as f64 * jitter)).await;
                continue;
            }

            return Err(err);
        }
    }
}

#[async_trait]
impl Recognizer for SpeechRecognizer {
    #[instrument(skip_all, fields(audio = %audio_path.display(), language))]
    async fn recognize(
        &self,
        audio_path: &Path,
        language: &str,
        duration_seconds: Option<f64>,
        progress: ProgressFn<'_>,
        cancel: &CancelToken,
    ) -> Result<Vec<RecognizerHit>> {
        if cancel.is_cancelled() {
            return Err(SzinkronError::Cancelled);
        }
        self.token()?;

        let size = tokio::fs::metadata(audio_path).await?.len();
        let staged = use_staged_path(
            size,
            self.settings.sync_size_limit_mb,
            duration_seconds,
            self.settings.sync_duration_limit_seconds,
        );
        info!(
            size_mb = size as f64 / (1024.0 * 1024.0),
            staged, "Starting recognition"
        );

        if staged {
            self.recognize_staged(audio_path, language, progress, cancel)
                .await
        } else {
            let hits = self.recognize_sync(audio_path, language).await?;
            progress(100);
            Ok(hits)
        }
    }
}

/// Classify a recognizer HTTP failure.
fn map_remote_error(status: reqwest::StatusCode, body: &str) -> SzinkronError {
    let lower = body.to_lowercase();
    match status.as_u16() {
        429 => SzinkronError::QuotaExceeded(truncate(body, 200)),
        400 if lower.contains("language") => SzinkronError::UnsupportedLanguage(truncate(body, 200)),
        400 if lower.contains("encoding") || lower.contains("sample rate") => {
            SzinkronError::AudioFormatRejected(truncate(body, 200))
        }
        400..=499 => SzinkronError::InvalidRequest(truncate(body, 200)),
        _ => SzinkronError::TransientRemote(format!("status {}: {}", status, truncate(body, 200))),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[derive(Deserialize)]
struct WireWord {
    #[serde(default)]
    word: String,
    #[serde(rename = "startTime", default)]
    start_time: String,
    #[serde(rename = "endTime", default)]
    end_time: String,
    #[serde(default)]
    confidence: f64,
}

/// Extract ordered word hits from a recognize/operation response.
fn parse_hits(response: &serde_json::Value) -> Result<Vec<RecognizerHit>> {
    let mut hits = Vec::new();

    let results = match response["results"].as_array() {
        Some(r) => r,
        None => return Ok(hits),
    };

    for result in results {
        let alternative = match result["alternatives"].as_array().and_then(|a| a.first()) {
            Some(a) => a,
            None => continue,
        };
        let words = match alternative["words"].as_array() {
            Some(w) => w,
            None => continue,
        };
        for raw in words {
            let wire: WireWord = serde_json::from_value(raw.clone())?;
            let start = parse_duration_string(&wire.start_time).unwrap_or(0.0);
            let end = parse_duration_string(&wire.end_time).unwrap_or(start);
            if wire.word.is_empty() {
                continue;
            }
            hits.push(RecognizerHit {
                word: wire.word,
                start_seconds: start,
                end_seconds: end.max(start),
                confidence: wire.confidence.clamp(0.0, 1.0),
            });
        }
    }

    hits.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));
    Ok(hits)
}

/// Parse protobuf-style duration strings like `"1.300s"`.
fn parse_duration_string(raw: &str) -> Option<f64> {
    raw.trim().trim_end_matches('s').parse().ok()
}
