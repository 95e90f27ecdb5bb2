//! HTTP API server command.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::server;
use std::sync::Arc;

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let orchestrator = Arc::new(Orchestrator::new(settings)?);
    orchestrator.providers().refresh_catalogs().await;

    Output::header("Szinkron API Server");
    println!();
    Output::success(&format!("Listening on http://{}:{}", host, port));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Transcribe", "POST   /v1/transcribe");
    Output::kv("Translate", "POST   /v1/translate");
    Output::kv("Synthesize", "POST   /v1/synthesize");
    Output::kv("Dub", "POST   /v1/dub");
    Output::kv("Jobs", "GET    /v1/jobs, GET /v1/jobs/{id}");
    Output::kv("Artifact", "GET    /v1/jobs/{id}/artifact?kind=...");
    Output::kv("Cancel", "POST   /v1/jobs/{id}/cancel");
    Output::kv("Delete", "DELETE /v1/jobs/{id}");
    Output::kv("Providers", "GET    /v1/tts-providers");
    Output::kv("Voices", "GET    /v1/tts-providers/{id}/voices");
    Output::kv("Cost compare", "GET    /v1/tts-cost-comparison?text=...");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    server::serve(orchestrator, &host, port).await
}
