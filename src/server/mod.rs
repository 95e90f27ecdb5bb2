//! HTTP API server: a thin adapter over the orchestrator.

use crate::artifacts::ArtifactKind;
use crate::config::TranslationContext;
use crate::error::SzinkronError;
use crate::ids::JobId;
use crate::jobs::{
    AudioQuality, Job, JobKind, JobRequest, JobStatus, PostEditOptions, SynthesisOptions,
    TranslationOptions,
};
use crate::orchestrator::Orchestrator;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Build the API router.
pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/v1/transcribe", post(submit_transcribe))
        .route("/v1/translate", post(submit_translate))
        .route("/v1/synthesize", post(submit_synthesize))
        .route("/v1/dub", post(submit_dub))
        .route("/v1/jobs", get(list_jobs))
        .route("/v1/jobs/{job_id}", get(job_status))
        .route("/v1/jobs/{job_id}", delete(delete_job))
        .route("/v1/jobs/{job_id}/cancel", post(cancel_job))
        .route("/v1/jobs/{job_id}/artifact", get(fetch_artifact))
        .route("/v1/tts-providers", get(list_providers))
        .route("/v1/tts-providers/{provider_id}/voices", get(list_voices))
        .route("/v1/tts-cost-comparison", get(cost_comparison))
        .layer(cors)
        .with_state(orchestrator)
}

/// Run the server until shutdown, with a background TTL sweep.
pub async fn serve(orchestrator: Arc<Orchestrator>, host: &str, port: u16) -> anyhow::Result<()> {
    let sweeper = Arc::clone(&orchestrator);
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            tick.tick().await;
            sweeper.sweep_expired().await;
        }
    });

    let router = create_router(orchestrator);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}

// === request/response types ===

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TranscribeBody {
    url: String,
    #[serde(default)]
    test_mode: bool,
    #[serde(default = "default_true")]
    breath_detection: bool,
    #[serde(default)]
    post_edit: PostEditOptions,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TranslateBody {
    transcript: String,
    target_lang: String,
    #[serde(default)]
    context: TranslationContext,
    #[serde(default = "default_audience")]
    audience: String,
    #[serde(default = "default_tone")]
    tone: String,
    #[serde(default = "default_quality")]
    quality: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SynthesizeBody {
    script: String,
    #[serde(default = "default_provider")]
    provider: String,
    #[serde(default)]
    voice_id: Option<String>,
    #[serde(default)]
    quality: AudioQuality,
    #[serde(default = "default_format")]
    format: String,
    #[serde(default)]
    language: Option<String>,
}

fn default_true() -> bool {
    true
}
fn default_audience() -> String {
    "general public".to_string()
}
fn default_tone() -> String {
    "neutral".to_string()
}
fn default_quality() -> String {
    "balanced".to_string()
}
fn default_provider() -> String {
    "auto".to_string()
}
fn default_format() -> String {
    "mp3".to_string()
}

#[derive(Serialize)]
struct SubmitResponse {
    job_id: String,
    status: JobStatus,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: String,
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
    #[serde(default)]
    status: Option<JobStatus>,
}

fn default_limit() -> usize {
    20
}

#[derive(Deserialize)]
struct ArtifactQuery {
    kind: String,
}

#[derive(Deserialize)]
struct VoicesQuery {
    #[serde(default)]
    language: Option<String>,
}

#[derive(Deserialize)]
struct ComparisonQuery {
    text: String,
    #[serde(default = "default_comparison_language")]
    language: String,
}

fn default_comparison_language() -> String {
    "en-US".to_string()
}

// === handlers ===

async fn health(State(orch): State<Arc<Orchestrator>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "providers_ready": orch.providers().any_configured(),
        "language": orch.settings().recognizer.language_code,
    }))
}

async fn submit_transcribe(
    State(orch): State<Arc<Orchestrator>>,
    Json(body): Json<TranscribeBody>,
) -> Response {
    let request = JobRequest {
        url: Some(body.url),
        test_mode: body.test_mode,
        breath_detection: body.breath_detection,
        post_edit: body.post_edit,
        language: body.language,
        ..Default::default()
    };
    submit(&orch, JobKind::Transcribe, request)
}

async fn submit_translate(
    State(orch): State<Arc<Orchestrator>>,
    Json(body): Json<TranslateBody>,
) -> Response {
    let request = JobRequest {
        transcript: Some(body.transcript),
        translation: TranslationOptions {
            enabled: true,
            target_language: body.target_lang,
            context: body.context,
            audience: body.audience,
            tone: body.tone,
            quality: body.quality,
        },
        ..Default::default()
    };
    submit(&orch, JobKind::Translate, request)
}

async fn submit_synthesize(
    State(orch): State<Arc<Orchestrator>>,
    Json(body): Json<SynthesizeBody>,
) -> Response {
    let request = JobRequest {
        transcript: Some(body.script),
        language: body.language,
        synthesis: SynthesisOptions {
            enabled: true,
            provider: body.provider,
            voice_id: body.voice_id,
            quality: body.quality,
            format: body.format,
        },
        ..Default::default()
    };
    submit(&orch, JobKind::Synthesize, request)
}

async fn submit_dub(
    State(orch): State<Arc<Orchestrator>>,
    Json(request): Json<JobRequest>,
) -> Response {
    submit(&orch, JobKind::Dub, request)
}

fn submit(orch: &Arc<Orchestrator>, kind: JobKind, request: JobRequest) -> Response {
    match Arc::clone(orch).submit(kind, request) {
        Ok(id) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                job_id: id.to_string(),
                status: JobStatus::Queued,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

async fn job_status(
    State(orch): State<Arc<Orchestrator>>,
    Path(job_id): Path<String>,
) -> Response {
    match parse_id(&job_id).and_then(|id| orch.status(&id)) {
        Ok(job) => Json(snapshot(&job)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn list_jobs(
    State(orch): State<Arc<Orchestrator>>,
    Query(query): Query<ListQuery>,
) -> Response {
    let jobs = orch.list(query.limit, query.offset, query.status);
    let rows: Vec<serde_json::Value> = jobs.iter().map(snapshot).collect();
    Json(serde_json::json!({ "jobs": rows, "count": rows.len() })).into_response()
}

async fn cancel_job(
    State(orch): State<Arc<Orchestrator>>,
    Path(job_id): Path<String>,
) -> Response {
    match parse_id(&job_id).and_then(|id| orch.cancel(&id)) {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => error_response(e),
    }
}

async fn delete_job(
    State(orch): State<Arc<Orchestrator>>,
    Path(job_id): Path<String>,
) -> Response {
    let id = match parse_id(&job_id) {
        Ok(id) => id,
        Err(e) => return error_response(e),
    };
    match orch.delete(&id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

async fn fetch_artifact(
    State(orch): State<Arc<Orchestrator>>,
    Path(job_id): Path<String>,
    Query(query): Query<ArtifactQuery>,
) -> Response {
    let id = match parse_id(&job_id) {
        Ok(id) => id,
        Err(e) => return error_response(e),
    };
    let kind: ArtifactKind = match query.kind.parse() {
        Ok(k) => k,
        Err(e) => return error_response(SzinkronError::InvalidRequest(e)),
    };

    match orch.fetch(&id, kind).await {
        Ok((mut file, size)) => {
            let mut buf = Vec::with_capacity(size as usize);
            if let Err(e) = file.read_to_end(&mut buf).await {
                return error_response(SzinkronError::Io(e));
            }
            let content_type = match kind {
                ArtifactKind::Audio => "audio/mpeg",
                ArtifactKind::Video => "video/mp4",
                _ => "text/plain; charset=utf-8",
            };
            ([(header::CONTENT_TYPE, content_type)], buf).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn list_providers(State(orch): State<Arc<Orchestrator>>) -> Response {
    Json(orch.providers().summaries()).into_response()
}

async fn list_voices(
    State(orch): State<Arc<Orchestrator>>,
    Path(provider_id): Path<String>,
    Query(query): Query<VoicesQuery>,
) -> Response {
    let provider = match provider_id.parse::<crate::tts::TtsProvider>() {
        Ok(p) => p,
        Err(e) => return error_response(SzinkronError::InvalidRequest(e)),
    };
    match orch.providers().get(provider) {
        Some(synth) => Json(synth.list_voices(query.language.as_deref())).into_response(),
        None => error_response(SzinkronError::NotFound(provider_id)),
    }
}

async fn cost_comparison(
    State(orch): State<Arc<Orchestrator>>,
    Query(query): Query<ComparisonQuery>,
) -> Response {
    let rows = orch.providers().cost_comparison(&query.text, &query.language);
    let cheapest = rows.first().cloned();
    Json(serde_json::json!({
        "comparisons": rows,
        "recommendation": cheapest,
    }))
    .into_response()
}

// === helpers ===

fn parse_id(raw: &str) -> crate::error::Result<JobId> {
    JobId::parse(raw)
}

/// Job snapshot payload: always includes the ledger, even on failure.
fn snapshot(job: &Job) -> serde_json::Value {
    serde_json::json!({
        "job_id": job.id.to_string(),
        "kind": job.kind,
        "status": job.status,
        "progress": job.progress,
        "stage": job.stage,
        "title": job.title,
        "artifacts": job.artifacts,
        "cost": {
            "total_usd": job.ledger.total(),
            "actual_usd": job.ledger.actual_total(),
            "lines": job.ledger.lines(),
        },
        "post_editor_model": job.post_editor_model,
        "translator_model": job.translator_model,
        "created_at": job.created_at,
        "started_at": job.started_at,
        "ended_at": job.ended_at,
        "error": job.error,
    })
}

fn error_response(err: SzinkronError) -> Response {
    let status = match &err {
        SzinkronError::InvalidRequest(_)
        | SzinkronError::InputTooLarge(_)
        | SzinkronError::UnsupportedLanguage(_)
        | SzinkronError::VoiceNotFound { .. }
        | SzinkronError::ArtifactNotReady(_) => StatusCode::BAD_REQUEST,
        SzinkronError::NotFound(_) => StatusCode::NOT_FOUND,
        SzinkronError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
        SzinkronError::SourceUnavailable(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
            kind: err.kind().to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let resp = error_response(SzinkronError::NotFound("x".into()));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = error_response(SzinkronError::VoiceNotFound {
            provider: "p".into(),
            voice_id: "v".into(),
        });
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = error_response(SzinkronError::QuotaExceeded("x".into()));
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

        let resp = error_response(SzinkronError::Internal("x".into()));
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_transcribe_body_rejects_unknown_fields() {
        let raw = r#"{"url": "https://youtu.be/x", "frobnicate": 1}"#;
        assert!(serde_json::from_str::<TranscribeBody>(raw).is_err());
    }

    #[test]
    fn test_transcribe_body_defaults() {
        let raw = r#"{"url": "https://youtu.be/x"}"#;
        let body: TranscribeBody = serde_json::from_str(raw).unwrap();
        assert!(body.breath_detection);
        assert!(!body.test_mode);
        assert!(!body.post_edit.enabled);
    }

    #[test]
    fn test_synthesize_body_defaults() {
        let raw = r#"{"script": "[0:00:00] hello"}"#;
        let body: SynthesizeBody = serde_json::from_str(raw).unwrap();
        assert_eq!(body.provider, "auto");
        assert_eq!(body.format, "mp3");
        assert_eq!(body.quality, AudioQuality::High);
    }
}
