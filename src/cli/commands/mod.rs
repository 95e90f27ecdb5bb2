//! CLI command implementations.

mod doctor;
mod dub;
mod providers;
mod serve;
mod transcribe;
mod voices;

pub use doctor::run_doctor;
pub use dub::run_dub;
pub use providers::run_providers;
pub use serve::run_serve;
pub use transcribe::run_transcribe;
pub use voices::run_voices;

use crate::cli::Output;
use crate::ids::JobId;
use crate::jobs::JobStatus;
use crate::orchestrator::Orchestrator;
use std::sync::Arc;
use std::time::Duration;

/// Poll a job to a terminal state, driving a progress bar.
pub(crate) async fn watch_job(orchestrator: &Arc<Orchestrator>, id: &JobId) -> anyhow::Result<()> {
    let pb = Output::progress_bar("working");

    loop {
        let job = orchestrator.status(id)?;
        pb.set_position(job.progress as u64);
        if let Some(stage) = job.stage {
            pb.set_message(stage.as_str().to_string());
        }

        match job.status {
            JobStatus::Completed => {
                pb.finish_with_message("done");
                println!();
                Output::success(&format!("Job {} completed", id.short()));
                if job.ledger.actual_total() > 0.0 {
                    Output::kv("Cost", &format!("${:.4}", job.ledger.actual_total()));
                }
                for (kind, path) in &job.artifacts {
                    Output::kv(kind, path);
                }
                return Ok(());
            }
            JobStatus::Failed => {
                pb.abandon_with_message("failed");
                println!();
                let detail = job
                    .error
                    .map(|e| format!("{} ({})", e.message, e.kind))
                    .unwrap_or_else(|| "unknown error".to_string());
                Output::error(&format!("Job {} failed: {}", id.short(), detail));
                anyhow::bail!("job failed");
            }
            JobStatus::Cancelled => {
                pb.abandon_with_message("cancelled");
                println!();
                Output::warning(&format!("Job {} cancelled", id.short()));
                return Ok(());
            }
            JobStatus::Queued | JobStatus::Running => {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }
}
