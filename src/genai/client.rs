//! Region-scoped generative REST client.

use super::fallback::CallFailure;
use crate::config::GenAiSettings;
use crate::error::SzinkronError;
use serde_json::json;
use tracing::debug;

/// Generation parameters for one call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.85,
            max_output_tokens: 8192,
        }
    }
}

/// Client for `generateContent`-shaped model endpoints.
pub struct GenAiClient {
    client: reqwest::Client,
    settings: GenAiSettings,
}

impl GenAiClient {
    pub fn new(settings: GenAiSettings) -> Self {
        Self {
            client: crate::http::create_client(),
            settings,
        }
    }

    pub fn settings(&self) -> &GenAiSettings {
        &self.settings
    }

    /// Estimated cost of processing `chars` input characters.
    pub fn quote_chars(&self, chars: usize) -> f64 {
        chars as f64 / 1_000_000.0 * self.settings.price_per_million_chars
    }

    /// Issue one generation call against a specific (model, region) pair.
    pub async fn generate(
        &self,
        model: &str,
        region: &str,
        prompt: &str,
        config: GenerationConfig,
    ) -> std::result::Result<String, CallFailure> {
        let token = self
            .settings
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                CallFailure::Fatal(SzinkronError::Config(
                    "GOOGLE_ACCESS_TOKEN not configured for the generative API".into(),
                ))
            })?;

        let url = format!(
            "https://{region}-aiplatform.googleapis.com/v1/projects/{}/locations/{region}/publishers/google/models/{model}:generateContent",
            self.settings.project,
        );

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": config.temperature,
                "topP": config.top_p,
                "maxOutputTokens": config.max_output_tokens,
            },
        });

        debug!(%model, %region, prompt_chars = prompt.len(), "generateContent");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    CallFailure::RegionUnavailable(format!("{}: {}", region, e))
                } else {
                    CallFailure::Transient(SzinkronError::TransientNetwork(e.to_string()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &detail));
        }

        let parsed: serde_json::Value = response.json().await.map_err(|e| {
            CallFailure::Transient(SzinkronError::TransientRemote(format!(
                "Unparseable model response: {}",
                e
            )))
        })?;

        let text = parsed["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        text.ok_or_else(|| {
            CallFailure::Transient(SzinkronError::TransientRemote(
                "Model returned no text candidate".into(),
            ))
        })
    }
}

/// Map an HTTP failure to a fallback decision.
fn classify_failure(status: reqwest::StatusCode, detail: &str) -> CallFailure {
    let lower = detail.to_lowercase();
    match status.as_u16() {
        404 => CallFailure::ModelNotFound(shorten(detail)),
        400 if lower.contains("deprecated") || lower.contains("not supported") => {
            CallFailure::ModelNotFound(shorten(detail))
        }
        429 => CallFailure::Transient(SzinkronError::QuotaExceeded(shorten(detail))),
        503 if lower.contains("location") || lower.contains("region") => {
            CallFailure::RegionUnavailable(shorten(detail))
        }
        500..=599 => CallFailure::Transient(SzinkronError::TransientRemote(shorten(detail))),
        _ => CallFailure::Fatal(SzinkronError::InvalidRequest(shorten(detail))),
    }
}

fn shorten(s: &str) -> String {
    let trimmed: String = s.chars().take(200).collect();
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_classify_404_as_model_not_found() {
        assert!(matches!(
            classify_failure(StatusCode::NOT_FOUND, "no such model"),
            CallFailure::ModelNotFound(_)
        ));
    }

    #[test]
    fn test_classify_deprecated_model() {
        assert!(matches!(
            classify_failure(StatusCode::BAD_REQUEST, "model is deprecated"),
            CallFailure::ModelNotFound(_)
        ));
    }

    #[test]
    fn test_classify_region_unavailable() {
        assert!(matches!(
            classify_failure(StatusCode::SERVICE_UNAVAILABLE, "location not serving"),
            CallFailure::RegionUnavailable(_)
        ));
    }

    #[test]
    fn test_classify_server_error_transient() {
        assert!(matches!(
            classify_failure(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            CallFailure::Transient(_)
        ));
    }

    #[test]
    fn test_quote_chars() {
        let client = GenAiClient::new(GenAiSettings::default());
        let quote = client.quote_chars(1_000_000);
        assert!((quote - 0.20).abs() < 1e-9);
    }
}
