//! Job orchestrator.
//!
//! Accepts job requests, drives the stage pipeline on a fixed worker pool,
//! tracks progress and cost, and guarantees scratch cleanup on every exit
//! path. All job mutation goes through the registry; readers only ever see
//! snapshots.

use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::chunking::TranscriptChunker;
use crate::config::Settings;
use crate::error::{Result, SzinkronError};
use crate::genai::{GenAiClient, PostEditor, TranslationParams, Translator};
use crate::ids::{self, JobId};
use crate::jobs::{
    CancelToken, Job, JobError, JobKind, JobRegistry, JobRequest, JobStatus, ProgressPlan, Stage,
};
use crate::media;
use crate::recognizer::{Recognizer, SpeechRecognizer};
use crate::segmenter::{Script, ScriptFormatter, ScriptHeader};
use crate::tts::ProviderRegistry;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// The main orchestrator.
pub struct Orchestrator {
    settings: Settings,
    registry: Arc<JobRegistry>,
    artifacts: ArtifactStore,
    recognizer: Arc<dyn Recognizer>,
    post_editor: PostEditor,
    translator: Translator,
    tts: Arc<ProviderRegistry>,
    worker_slots: Arc<tokio::sync::Semaphore>,
}

impl Orchestrator {
    pub fn new(settings: Settings) -> Result<Self> {
        std::fs::create_dir_all(settings.data_dir())?;
        std::fs::create_dir_all(settings.temp_dir())?;

        let chunker = TranscriptChunker::new(&settings.chunking);
        let genai_client = GenAiClient::new(settings.genai.clone());
        let post_editor = PostEditor::new(GenAiClient::new(settings.genai.clone()), chunker);
        let translator = Translator::new(genai_client, TranscriptChunker::new(&settings.chunking));

        Ok(Self {
            registry: Arc::new(JobRegistry::new()),
            artifacts: ArtifactStore::new(settings.data_dir()),
            recognizer: Arc::new(SpeechRecognizer::new(settings.recognizer.clone())),
            post_editor,
            translator,
            tts: Arc::new(ProviderRegistry::new(settings.tts.clone())),
            worker_slots: Arc::new(tokio::sync::Semaphore::new(
                settings.jobs.max_concurrent_jobs,
            )),
            settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.tts
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Validate and enqueue a job; execution starts as soon as a worker
    /// slot frees up. Each submission creates a new job, identical requests
    /// included.
    pub fn submit(self: Arc<Self>, kind: JobKind, request: JobRequest) -> Result<JobId> {
        self.validate(kind, &request)?;

        let job = Job::new(kind, request);
        let id = job.id.clone();
        let cancel = self.registry.insert(job);

        let orchestrator = Arc::clone(&self);
        let job_id = id.clone();
        tokio::spawn(async move {
            orchestrator.run_job(job_id, cancel).await;
        });

        info!(job_id = %id, %kind, "Job submitted");
        Ok(id)
    }

    /// Request intake validation. Nothing runs and no job exists when this
    /// fails.
    fn validate(&self, kind: JobKind, request: &JobRequest) -> Result<()> {
        match kind {
            JobKind::Transcribe | JobKind::Dub => {
                let url = request.url.as_deref().ok_or_else(|| {
                    SzinkronError::InvalidRequest("A video URL is required".into())
                })?;
                if !ids::is_valid_video_url(url) {
                    return Err(SzinkronError::InvalidRequest(format!(
                        "Unsupported video URL: {}",
                        url
                    )));
                }
            }
            JobKind::Translate | JobKind::Synthesize => {
                let has_input = request.transcript.as_deref().is_some_and(|t| !t.trim().is_empty())
                    || request.url.is_some();
                if !has_input {
                    return Err(SzinkronError::InvalidRequest(
                        "A transcript or video URL is required".into(),
                    ));
                }
            }
        }

        if request.mux && !request.synthesis.enabled {
            return Err(SzinkronError::InvalidRequest(
                "Muxing requires synthesis to be enabled".into(),
            ));
        }
        if request.mux && request.url.is_none() {
            return Err(SzinkronError::InvalidRequest(
                "Muxing requires the original video URL".into(),
            ));
        }

        // the no-silent-remap gate: an explicit (provider, voice) pair must
        // exist before any stage runs
        if request.synthesis.enabled {
            let language = self.synthesis_language(request);
            self.tts.select(
                &request.synthesis.provider,
                request.synthesis.voice_id.as_deref(),
                &language,
            )?;
        }

        Ok(())
    }

    /// Language of the text that will be synthesized.
    fn synthesis_language(&self, request: &JobRequest) -> String {
        if request.translation.enabled {
            request.translation.target_language.clone()
        } else {
            request
                .language
                .clone()
                .unwrap_or_else(|| self.settings.recognizer.language_code.clone())
        }
    }

    /// Job snapshot.
    pub fn status(&self, id: &JobId) -> Result<Job> {
        self.registry
            .snapshot(id)
            .ok_or_else(|| SzinkronError::NotFound(format!("Unknown job: {}", id)))
    }

    /// Cooperative cancel; succeeds even when the job already terminated.
    pub fn cancel(&self, id: &JobId) -> Result<()> {
        if self.registry.request_cancel(id) {
            Ok(())
        } else {
            Err(SzinkronError::NotFound(format!("Unknown job: {}", id)))
        }
    }

    pub fn list(&self, limit: usize, offset: usize, status: Option<JobStatus>) -> Vec<Job> {
        self.registry.list(limit, offset, status)
    }

    /// Open an artifact stream.
    pub async fn fetch(
        &self,
        id: &JobId,
        kind: ArtifactKind,
    ) -> Result<(tokio::fs::File, u64)> {
        let job = self.status(id)?;
        let path = job.artifacts.get(kind.as_str()).ok_or_else(|| {
            SzinkronError::ArtifactNotReady(format!(
                "Job has no {} artifact yet",
                kind.as_str()
            ))
        })?;
        self.artifacts.open(id, path).await
    }

    /// Remove a job record and every file it produced.
    pub async fn delete(&self, id: &JobId) -> Result<()> {
        match self.registry.remove(id) {
            Some(_) => {
                self.artifacts.delete_job_dir(id).await;
                self.cleanup_scratch(id).await;
                Ok(())
            }
            None => Err(SzinkronError::NotFound(format!("Unknown job: {}", id))),
        }
    }

    /// TTL sweep of terminal jobs and their directories.
    pub async fn sweep_expired(&self) {
        let Some(ttl) = self.settings.jobs.artifact_ttl_seconds else {
            return;
        };
        for job in self.registry.sweep_expired(ttl) {
            info!(job_id = %job.id, "TTL sweep removing job");
            self.artifacts.delete_job_dir(&job.id).await;
            self.cleanup_scratch(&job.id).await;
        }
    }

    // === worker ===

    async fn run_job(self: Arc<Self>, id: JobId, cancel: CancelToken) {
        let _permit = match self.worker_slots.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => return,
        };

        // a cancel may have landed while the job sat in the queue
        if !self.registry.transition(&id, JobStatus::Running) {
            return;
        }

        let outcome = self.execute(&id, &cancel).await;

        match outcome {
            Ok(()) => {
                self.registry.update(&id, |j| j.progress = 100);
                self.registry.transition(&id, JobStatus::Completed);
                info!(job_id = %id, "Job completed");
            }
            Err(SzinkronError::Cancelled) => {
                self.registry.transition(&id, JobStatus::Cancelled);
                info!(job_id = %id, "Job cancelled");
            }
            Err(e) => {
                let stage = self
                    .registry
                    .snapshot(&id)
                    .and_then(|j| j.stage)
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_default();
                error!(job_id = %id, %stage, "Job failed: {}", e);
                self.registry.update(&id, |j| {
                    j.error = Some(JobError {
                        kind: e.kind().to_string(),
                        stage,
                        message: e.to_string(),
                        remote_detail: None,
                    });
                });
                self.registry.transition(&id, JobStatus::Failed);
            }
        }

        // scratch inputs go on every exit path; artifacts stay for delete/TTL
        self.cleanup_scratch(&id).await;
    }

    fn plan_for(&self, request: &JobRequest) -> ProgressPlan {
        let mut stages = Vec::new();
        if request.transcript.is_none() {
            stages.extend([Stage::Download, Stage::Decode, Stage::Recognize, Stage::Segment]);
        }
        if request.post_edit.enabled {
            stages.push(Stage::PostEdit);
        }
        if request.translation.enabled {
            stages.push(Stage::Translate);
        }
        if request.synthesis.enabled {
            stages.push(Stage::Synthesize);
        }
        if request.mux {
            stages.push(Stage::Mux);
        }
        ProgressPlan::new(stages)
    }

    #[instrument(skip_all, fields(job_id = %id))]
    async fn execute(&self, id: &JobId, cancel: &CancelToken) -> Result<()> {
        let job = self.status(id)?;
        let request = job.request.clone();
        let plan = self.plan_for(&request);
        let cost_cap = request.max_cost_usd.or(self.settings.jobs.max_cost_usd);
        let scratch = self.scratch_dir(id);

        let mut script = match &request.transcript {
            Some(text) => {
                // prior artifact provided: the acquire stages are skipped
                Script::parse_body(text).map_err(|_| {
                    SzinkronError::InvalidRequest("Provided transcript is not a timed script".into())
                })?
            }
            None => {
                self.acquire_and_transcribe(id, &request, &plan, cost_cap, &scratch, cancel)
                    .await?
            }
        };

        if request.post_edit.enabled {
            script = self
                .post_edit_stage(id, &request, &plan, cost_cap, script, cancel)
                .await?;
        }

        if request.translation.enabled {
            script = self
                .translate_stage(id, &request, &plan, cost_cap, script, cancel)
                .await?;
        }

        let mut audio_path: Option<PathBuf> = None;
        if request.synthesis.enabled {
            audio_path = self
                .synthesize_stage(id, &request, &plan, cost_cap, &script, cancel)
                .await?;
        }

        if request.mux {
            self.mux_stage(id, &request, &plan, audio_path, &scratch, cancel)
                .await?;
        }

        Ok(())
    }

    /// Download, decode, recognize and segment. Returns the timed script.
    async fn acquire_and_transcribe(
        &self,
        id: &JobId,
        request: &JobRequest,
        plan: &ProgressPlan,
        cost_cap: Option<f64>,
        scratch: &PathBuf,
        cancel: &CancelToken,
    ) -> Result<Script> {
        let url = request.url.as_deref().expect("validated at intake");
        let language = request
            .language
            .clone()
            .unwrap_or_else(|| self.settings.recognizer.language_code.clone());

        // download
        self.enter_stage(id, plan, Stage::Download, cancel)?;
        let deadline = Duration::from_secs(self.settings.video.download_deadline_seconds);
        let meta = media::fetch_metadata(url, deadline).await?;
        if let Some(duration) = meta.duration_seconds {
            let cap = self.settings.recognizer.max_duration_seconds;
            if !request.test_mode && duration > cap {
                return Err(SzinkronError::InvalidRequest(format!(
                    "Media duration ({}s) exceeds the maximum ({}s)",
                    duration, cap
                )));
            }
        }
        self.registry.update(id, |j| j.title = Some(meta.title.clone()));
        let audio_raw =
            media::download_audio(url, &meta.video_id, scratch, request.test_mode, deadline)
                .await?;
        self.finish_stage(id, plan, Stage::Download);

        // decode
        self.enter_stage(id, plan, Stage::Decode, cancel)?;
        let flac = media::to_flac(
            &audio_raw,
            self.settings.recognizer.sample_rate,
            self.settings.recognizer.channels,
        )
        .await?;
        let duration = media::probe_duration(&flac).await.ok();
        self.finish_stage(id, plan, Stage::Decode);

        // recognize (billable)
        self.enter_stage(id, plan, Stage::Recognize, cancel)?;
        let minutes = duration.unwrap_or(60.0) / 60.0;
        let rate = self.settings.recognizer.price_per_minute;
        self.gate_and_quote(id, Stage::Recognize, minutes, rate, cost_cap)?;

        let registry = Arc::clone(&self.registry);
        let job_id = id.clone();
        let plan_clone = plan.clone();
        let report = move |sub: u8| {
            let progress = plan_clone.progress_at(Stage::Recognize, sub);
            registry.update(&job_id, |j| j.progress = progress.max(j.progress));
        };
        let hits = self
            .recognizer
            .recognize(&flac, &language, duration, &report, cancel)
            .await?;
        self.registry
            .update(id, |j| j.ledger.actual(Stage::Recognize, minutes, rate));
        self.finish_stage(id, plan, Stage::Recognize);

        // segment
        self.enter_stage(id, plan, Stage::Segment, cancel)?;
        let formatter = ScriptFormatter::new(self.settings.pauses.clone());
        let header = ScriptHeader {
            title: meta.title.clone(),
            processed_at: Utc::now().format("%Y-%m-%d %H:%M").to_string(),
            post_editor: None,
            translator: None,
        };
        let (script, stats) = formatter.format(&hits, header, request.breath_detection);
        info!(
            words = stats.total_words,
            wpm = %format!("{:.0}", stats.words_per_minute),
            confidence = %format!("{:.2}", stats.mean_confidence),
            "Transcript segmented"
        );

        let path = self
            .artifacts
            .write_text(id, ArtifactKind::Transcript, &language, &script.render())
            .await?;
        self.record_artifact(id, ArtifactKind::Transcript, &path);
        self.finish_stage(id, plan, Stage::Segment);

        Ok(script)
    }

    async fn post_edit_stage(
        &self,
        id: &JobId,
        request: &JobRequest,
        plan: &ProgressPlan,
        cost_cap: Option<f64>,
        script: Script,
        cancel: &CancelToken,
    ) -> Result<Script> {
        self.enter_stage(id, plan, Stage::PostEdit, cancel)?;
        if script.is_empty() {
            self.finish_stage(id, plan, Stage::PostEdit);
            return Ok(script);
        }

        let quote = self.post_editor.quote(&script);
        self.gate_and_quote(id, Stage::PostEdit, script.char_count() as f64, quote_rate(quote, &script), cost_cap)?;

        let model = request
            .post_edit
            .model
            .clone()
            .unwrap_or_else(|| self.settings.genai.model.clone());
        let (edited, pair) = self.post_editor.edit(&script, &model, cancel).await?;

        self.registry.update(id, |j| {
            j.post_editor_model = Some(pair.tag());
            j.ledger
                .actual(Stage::PostEdit, edited.char_count() as f64, quote_rate(quote, &script));
        });

        let language = request
            .language
            .clone()
            .unwrap_or_else(|| self.settings.recognizer.language_code.clone());
        let path = self
            .artifacts
            .write_text(id, ArtifactKind::Script, &language, &edited.render())
            .await?;
        self.record_artifact(id, ArtifactKind::Script, &path);
        self.finish_stage(id, plan, Stage::PostEdit);

        Ok(edited)
    }

    async fn translate_stage(
        &self,
        id: &JobId,
        request: &JobRequest,
        plan: &ProgressPlan,
        cost_cap: Option<f64>,
        script: Script,
        cancel: &CancelToken,
    ) -> Result<Script> {
        self.enter_stage(id, plan, Stage::Translate, cancel)?;
        if script.is_empty() {
            self.finish_stage(id, plan, Stage::Translate);
            return Ok(script);
        }

        let quote = self.translator.quote(&script);
        self.gate_and_quote(id, Stage::Translate, script.char_count() as f64, quote_rate(quote, &script), cost_cap)?;

        let params = TranslationParams {
            target_language: request.translation.target_language.clone(),
            context: request.translation.context,
            audience: request.translation.audience.clone(),
            tone: request.translation.tone.clone(),
            quality: request.translation.quality.parse().unwrap_or_default(),
        };
        let model = request
            .post_edit
            .model
            .clone()
            .unwrap_or_else(|| self.settings.genai.model.clone());
        let (translated, pair) = self
            .translator
            .translate(&script, &params, &model, cancel)
            .await?;

        self.registry.update(id, |j| {
            j.translator_model = Some(pair.tag());
            j.ledger.actual(
                Stage::Translate,
                translated.char_count() as f64,
                quote_rate(quote, &script),
            );
        });

        let path = self
            .artifacts
            .write_text(
                id,
                ArtifactKind::Translation,
                &request.translation.target_language,
                &translated.render(),
            )
            .await?;
        self.record_artifact(id, ArtifactKind::Translation, &path);
        self.finish_stage(id, plan, Stage::Translate);

        Ok(translated)
    }

    async fn synthesize_stage(
        &self,
        id: &JobId,
        request: &JobRequest,
        plan: &ProgressPlan,
        cost_cap: Option<f64>,
        script: &Script,
        cancel: &CancelToken,
    ) -> Result<Option<PathBuf>> {
        self.enter_stage(id, plan, Stage::Synthesize, cancel)?;
        if script.is_empty() {
            self.finish_stage(id, plan, Stage::Synthesize);
            return Ok(None);
        }

        let language = self.synthesis_language(request);
        let (synth, voice) = self.tts.select(
            &request.synthesis.provider,
            request.synthesis.voice_id.as_deref(),
            &language,
        )?;

        let chars: usize = script
            .segments
            .iter()
            .map(|s| s.clean_text().chars().count())
            .sum();
        let estimate = synth.quote(chars, &voice, request.synthesis.quality);
        let per_char_rate = if chars > 0 {
            estimate.amount_usd / chars as f64
        } else {
            0.0
        };
        self.gate_and_quote(id, Stage::Synthesize, chars as f64, per_char_rate, cost_cap)?;

        let output_path = self.artifacts.path_for(
            id,
            ArtifactKind::Audio,
            &language,
            &request.synthesis.format,
        );
        let output = synth
            .synthesize(
                script,
                &voice,
                request.synthesis.quality,
                &request.synthesis.format,
                &output_path,
                cancel,
            )
            .await?;

        self.registry.update(id, |j| {
            j.ledger
                .actual(Stage::Synthesize, output.character_count as f64, per_char_rate);
        });
        self.record_artifact(id, ArtifactKind::Audio, &output.audio_path);
        self.finish_stage(id, plan, Stage::Synthesize);

        Ok(Some(output.audio_path))
    }

    async fn mux_stage(
        &self,
        id: &JobId,
        request: &JobRequest,
        plan: &ProgressPlan,
        audio_path: Option<PathBuf>,
        scratch: &PathBuf,
        cancel: &CancelToken,
    ) -> Result<()> {
        self.enter_stage(id, plan, Stage::Mux, cancel)?;
        let Some(audio) = audio_path else {
            // empty script produced no audio; nothing to mux
            self.finish_stage(id, plan, Stage::Mux);
            return Ok(());
        };

        let url = request.url.as_deref().expect("validated at intake");
        let video_id = ids::extract_video_id(url).unwrap_or_else(|| "source".to_string());
        let language = self.synthesis_language(request);
        let output_path = self.artifacts.path_for(
            id,
            ArtifactKind::Video,
            &language,
            &self.settings.video.output_format,
        );

        let result = media::replace_audio(
            url,
            &video_id,
            &audio,
            &output_path,
            scratch,
            &self.settings.video.output_format,
            Duration::from_secs(self.settings.video.download_deadline_seconds),
            Duration::from_secs(self.settings.video.mux_deadline_seconds),
        )
        .await?;

        info!(
            duration = result.duration_seconds,
            size_mb = result.file_size_bytes / (1024 * 1024),
            "Mux complete"
        );
        self.record_artifact(id, ArtifactKind::Video, &result.video_path);
        self.finish_stage(id, plan, Stage::Mux);
        Ok(())
    }

    // === stage bookkeeping ===

    fn enter_stage(
        &self,
        id: &JobId,
        plan: &ProgressPlan,
        stage: Stage,
        cancel: &CancelToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(SzinkronError::Cancelled);
        }
        let progress = plan.progress_at(stage, 0);
        self.registry.update(id, |j| {
            j.stage = Some(stage);
            j.progress = progress.max(j.progress);
        });
        info!(job_id = %id, %stage, "Stage started");
        Ok(())
    }

    fn finish_stage(&self, id: &JobId, plan: &ProgressPlan, stage: Stage) {
        let progress = plan.progress_at(stage, 100);
        self.registry
            .update(id, |j| j.progress = progress.max(j.progress));
    }

    /// Record the expected cost of a billable stage and fail with
    /// `BudgetExceeded` before spending when the projection passes the cap.
    fn gate_and_quote(
        &self,
        id: &JobId,
        stage: Stage,
        units: f64,
        rate: f64,
        cap: Option<f64>,
    ) -> Result<()> {
        let amount = (units * rate).max(0.0);
        let job = self.status(id)?;
        if let Some(projected) = job.ledger.would_exceed(amount, cap) {
            return Err(SzinkronError::BudgetExceeded {
                projected,
                limit: cap.unwrap_or_default(),
            });
        }
        self.registry
            .update(id, |j| j.ledger.quote(stage, units, rate));
        Ok(())
    }

    fn record_artifact(&self, id: &JobId, kind: ArtifactKind, path: &std::path::Path) {
        let path = path.to_string_lossy().into_owned();
        self.registry.update(id, |j| {
            j.artifacts.insert(kind.as_str().to_string(), path.clone());
        });
    }

    fn scratch_dir(&self, id: &JobId) -> PathBuf {
        self.settings.temp_dir().join(id.as_str())
    }

    async fn cleanup_scratch(&self, id: &JobId) {
        let dir = self.scratch_dir(id);
        if dir.exists() {
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                warn!("Failed to remove scratch dir {}: {}", dir.display(), e);
            }
        }
    }
}

/// Per-unit rate implied by a whole-script quote.
fn quote_rate(quote_amount: f64, script: &Script) -> f64 {
    let chars = script.char_count().max(1);
    quote_amount / chars as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::SynthesisOptions;

    fn orchestrator() -> Arc<Orchestrator> {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.general.data_dir = dir.path().join("data").to_string_lossy().into_owned();
        settings.general.temp_dir = dir.path().join("tmp").to_string_lossy().into_owned();
        settings.tts.elevenlabs_api_key = Some("key".into());
        settings.tts.google_api_key = Some("key".into());
        // leak the tempdir so the test orchestrator's paths stay valid
        std::mem::forget(dir);
        Arc::new(Orchestrator::new(settings).unwrap())
    }

    #[tokio::test]
    async fn test_submit_requires_url_for_transcribe() {
        let orch = orchestrator();
        let err = orch
            .clone()
            .submit(JobKind::Transcribe, JobRequest::default())
            .unwrap_err();
        assert!(matches!(err, SzinkronError::InvalidRequest(_)));
        assert!(orch.registry().is_empty());
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_url() {
        let orch = orchestrator();
        let request = JobRequest {
            url: Some("https://example.com/video".into()),
            ..Default::default()
        };
        let err = orch.clone().submit(JobKind::Transcribe, request).unwrap_err();
        assert!(matches!(err, SzinkronError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_explicit_missing_voice_fails_before_job_creation() {
        let orch = orchestrator();
        let request = JobRequest {
            url: Some("https://youtu.be/dQw4w9WgXcQ".into()),
            synthesis: SynthesisOptions {
                enabled: true,
                provider: "elevenlabs".into(),
                voice_id: Some("V-not-in-P".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = orch.clone().submit(JobKind::Dub, request).unwrap_err();
        assert!(matches!(err, SzinkronError::VoiceNotFound { .. }));
        // no job record was created
        assert!(orch.registry().is_empty());
    }

    #[tokio::test]
    async fn test_mux_without_synthesis_rejected() {
        let orch = orchestrator();
        let request = JobRequest {
            url: Some("https://youtu.be/dQw4w9WgXcQ".into()),
            mux: true,
            ..Default::default()
        };
        let err = orch.clone().submit(JobKind::Dub, request).unwrap_err();
        assert!(matches!(err, SzinkronError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_translate_accepts_inline_transcript() {
        let orch = orchestrator();
        let request = JobRequest {
            transcript: Some("[0:00:00] szia".into()),
            translation: crate::jobs::TranslationOptions {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        };
        // validation passes; the job is created (it will fail later without
        // credentials, which is fine for this test)
        let id = orch.clone().submit(JobKind::Translate, request).unwrap();
        assert!(orch.status(&id).is_ok());
    }

    #[tokio::test]
    async fn test_status_unknown_job() {
        let orch = orchestrator();
        let err = orch.status(&JobId::generate()).unwrap_err();
        assert!(matches!(err, SzinkronError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_cancel_unknown_job() {
        let orch = orchestrator();
        let err = orch.cancel(&JobId::generate()).unwrap_err();
        assert!(matches!(err, SzinkronError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_before_artifact_is_not_ready() {
        let orch = orchestrator();
        let request = JobRequest {
            transcript: Some("[0:00:00] szia".into()),
            translation: crate::jobs::TranslationOptions {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let id = orch.clone().submit(JobKind::Translate, request).unwrap();
        let err = orch.fetch(&id, ArtifactKind::Translation).await.unwrap_err();
        assert!(matches!(
            err,
            SzinkronError::ArtifactNotReady(_) | SzinkronError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let orch = orchestrator();
        let request = JobRequest {
            transcript: Some("[0:00:00] szia".into()),
            translation: crate::jobs::TranslationOptions {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let id = orch.clone().submit(JobKind::Translate, request).unwrap();
        orch.delete(&id).await.unwrap();
        assert!(orch.status(&id).is_err());
    }

    #[test]
    fn test_plan_for_full_dub() {
        let orch = orchestrator();
        let request = JobRequest {
            url: Some("https://youtu.be/dQw4w9WgXcQ".into()),
            post_edit: crate::jobs::PostEditOptions {
                enabled: true,
                model: None,
            },
            translation: crate::jobs::TranslationOptions {
                enabled: true,
                ..Default::default()
            },
            synthesis: SynthesisOptions {
                enabled: true,
                ..Default::default()
            },
            mux: true,
            ..Default::default()
        };
        let plan = orch.plan_for(&request);
        assert_eq!(plan.stages().len(), 8);
        assert_eq!(plan.progress_at(Stage::Mux, 100), 100);
    }

    #[test]
    fn test_plan_skips_acquisition_with_transcript() {
        let orch = orchestrator();
        let request = JobRequest {
            transcript: Some("[0:00:00] x".into()),
            translation: crate::jobs::TranslationOptions {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let plan = orch.plan_for(&request);
        assert_eq!(plan.stages(), &[Stage::Translate]);
    }
}
