//! Transcription command.

use super::watch_job;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::jobs::{JobKind, JobRequest, PostEditOptions};
use crate::orchestrator::Orchestrator;
use std::sync::Arc;

/// Run a transcription job from the command line.
#[allow(clippy::too_many_arguments)]
pub async fn run_transcribe(
    url: String,
    test: bool,
    no_breath: bool,
    post_edit: bool,
    model: Option<String>,
    language: Option<String>,
    settings: Settings,
) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Transcribe, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'szinkron doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Arc::new(Orchestrator::new(settings)?);

    let request = JobRequest {
        url: Some(url),
        test_mode: test,
        breath_detection: !no_breath,
        language,
        post_edit: PostEditOptions {
            enabled: post_edit,
            model,
        },
        ..Default::default()
    };

    let id = Arc::clone(&orchestrator).submit(JobKind::Transcribe, request)?;
    Output::info(&format!("Transcription job {} started", id.short()));

    watch_job(&orchestrator, &id).await
}
