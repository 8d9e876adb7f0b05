// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end tests driving `PipelineEngine`/`Application` through full job
//! runs with the local/deterministic adapter set, one test per literal
//! scenario: happy path, quota retry, fallback after exhaustion, a fatal
//! render failure, audio/video duration padding, resume after a crash, and
//! cancellation observed mid-run.

use async_trait::async_trait;
use mdvid_domain::entities::{Job, JobContext, JobStatus};
use mdvid_domain::error::PipelineError;
use mdvid_domain::repositories::{CheckpointStore, JobStore};
use mdvid_domain::services::StageRegistry;
use mdvid_domain::value_objects::{StageOrder, TokenUsage};
use mdvid_engine::application::Application;
use mdvid_engine::infrastructure::adapters::local::{
    LocalAnimationRenderer, LocalAvMuxer, LocalHttpFetcher, LocalImageSearchService, LocalLlmService,
    LocalMediaProbe, LocalSpeechSynthesizer,
};
use mdvid_engine::infrastructure::adapters::{AnimationRenderer, LlmService, RenderQuality};
use mdvid_engine::infrastructure::repositories::{FsCheckpointStore, SqliteJobStore};
use mdvid_engine::infrastructure::stages::build_standard_adapters;
use mdvid_engine::PipelineEngine;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn job_store() -> Arc<dyn JobStore> {
    Arc::new(SqliteJobStore::connect("sqlite::memory:").await.expect("in-memory sqlite connects"))
}

fn checkpoint_store(dir: &Path) -> Arc<dyn CheckpointStore> {
    Arc::new(FsCheckpointStore::new(dir))
}

async fn write_style_and_input(workspace: &Path, style: &str) -> PathBuf {
    let styles_dir = workspace.join("styles");
    tokio::fs::create_dir_all(&styles_dir).await.unwrap();
    tokio::fs::write(styles_dir.join(format!("{style}.md")), "narrate calmly").await.unwrap();

    let input_path = workspace.join("doc.md");
    tokio::fs::write(&input_path, "# Title\n\nSome body text about a topic.\n").await.unwrap();
    input_path
}

fn engine_with_adapters(
    job_store: Arc<dyn JobStore>,
    checkpoint_store: Arc<dyn CheckpointStore>,
    llm: Arc<dyn LlmService>,
    renderer: Arc<dyn AnimationRenderer>,
    workspace: PathBuf,
) -> Arc<PipelineEngine> {
    engine_with_ceiling(job_store, checkpoint_store, llm, renderer, workspace, 50)
}

fn engine_with_ceiling(
    job_store: Arc<dyn JobStore>,
    checkpoint_store: Arc<dyn CheckpointStore>,
    llm: Arc<dyn LlmService>,
    renderer: Arc<dyn AnimationRenderer>,
    workspace: PathBuf,
    total_retry_ceiling: u32,
) -> Arc<PipelineEngine> {
    let probe = Arc::new(LocalMediaProbe);
    let adapters = build_standard_adapters(
        llm,
        Arc::new(LocalImageSearchService),
        Arc::new(LocalHttpFetcher),
        renderer,
        Arc::new(LocalSpeechSynthesizer::new(workspace.join("audio"))),
        Arc::new(LocalAvMuxer::new(workspace.join("final"))),
        probe.clone(),
        workspace.clone(),
        "narrator-default".to_string(),
        50_000,
        "draft".to_string(),
    );

    Arc::new(PipelineEngine::new(
        StageRegistry::standard(),
        adapters,
        job_store,
        checkpoint_store,
        Duration::from_millis(1),
        Duration::from_millis(5),
        total_retry_ceiling,
        probe,
        workspace,
    ))
}

/// Scenario: every stage succeeds on its first attempt with ordinary local
/// adapters; the job reaches `Done` with a final muxed video path.
#[tokio::test]
async fn happy_path_completes_and_produces_final_video() {
    let workspace = tempfile::tempdir().unwrap();
    let input_path = write_style_and_input(workspace.path(), "default").await;

    let job_store = job_store().await;
    let checkpoint_store = checkpoint_store(workspace.path());
    let engine = engine_with_adapters(
        job_store.clone(),
        checkpoint_store.clone(),
        Arc::new(LocalLlmService),
        Arc::new(LocalAnimationRenderer::new(workspace.path().join("renders"))),
        workspace.path().to_path_buf(),
    );
    let app = Application::new(job_store, checkpoint_store, engine, "worker-1");

    let job = app.create_job(&input_path.display().to_string(), "default").await.unwrap();
    let context = app.run_job(&job.id.to_string()).await.unwrap();

    assert!(context.final_video_path.is_some());
    let report = app.status_job(&job.id.to_string()).await.unwrap();
    assert_eq!(report.job.status, JobStatus::Done);
}

/// An `LlmService` that fails with a quota error a fixed number of times
/// before delegating to a real completion, to exercise the Stage Runner's
/// retry/backoff loop.
struct FlakyQuotaLlm {
    failures_remaining: AtomicU32,
    inner: LocalLlmService,
}

impl FlakyQuotaLlm {
    fn new(failures: u32) -> Self {
        FlakyQuotaLlm {
            failures_remaining: AtomicU32::new(failures),
            inner: LocalLlmService,
        }
    }
}

#[async_trait]
impl LlmService for FlakyQuotaLlm {
    async fn complete(&self, prompt: &str) -> Result<(String, TokenUsage), PipelineError> {
        let was_positive = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| if n > 0 { Some(n - 1) } else { None })
            .is_ok();
        if was_positive {
            return Err(PipelineError::quota("llm", "rate limited, try again"));
        }
        self.inner.complete(prompt).await
    }
}

/// Scenario: the LLM reports quota exhaustion twice, then succeeds within
/// the stage's retry budget, so the job still reaches `Done` without ever
/// falling back.
#[tokio::test]
async fn llm_quota_errors_recover_via_retry() {
    let workspace = tempfile::tempdir().unwrap();
    let input_path = write_style_and_input(workspace.path(), "default").await;

    let job_store = job_store().await;
    let checkpoint_store = checkpoint_store(workspace.path());
    let engine = engine_with_adapters(
        job_store.clone(),
        checkpoint_store.clone(),
        Arc::new(FlakyQuotaLlm::new(2)),
        Arc::new(LocalAnimationRenderer::new(workspace.path().join("renders"))),
        workspace.path().to_path_buf(),
    );
    let app = Application::new(job_store, checkpoint_store, engine, "worker-1");

    let job = app.create_job(&input_path.display().to_string(), "default").await.unwrap();
    let context = app.run_job(&job.id.to_string()).await.unwrap();

    assert!(context.final_video_path.is_some());
    let report = app.status_job(&job.id.to_string()).await.unwrap();
    assert_eq!(report.job.status, JobStatus::Done);
    assert!(report.errors.iter().any(|e| e.kind == mdvid_domain::error::ErrorKind::Quota));
}

/// An `LlmService` that always fails with a quota error, forcing every
/// retry to exhaust and the degradable stages to fall back.
struct AlwaysQuotaLlm;

#[async_trait]
impl LlmService for AlwaysQuotaLlm {
    async fn complete(&self, _prompt: &str) -> Result<(String, TokenUsage), PipelineError> {
        Err(PipelineError::quota("llm", "rate limited permanently"))
    }
}

/// Scenario: the LLM never recovers. Every LLM-backed stage has a fallback
/// that needs no network access (reuse the first paragraph, a scaffold
/// scene, pass-through), so the stage runner exhausts each stage's retries
/// and then falls back rather than failing the job outright. Every
/// successful fallback use spends one unit of the degraded-stage budget,
/// so a job with this many fallback stages must land `Degraded`, not
/// `Done`.
#[tokio::test]
async fn llm_exhausted_falls_back_and_completes() {
    let workspace = tempfile::tempdir().unwrap();
    let input_path = write_style_and_input(workspace.path(), "default").await;

    let job_store = job_store().await;
    let checkpoint_store = checkpoint_store(workspace.path());
    let engine = engine_with_adapters(
        job_store.clone(),
        checkpoint_store.clone(),
        Arc::new(AlwaysQuotaLlm),
        Arc::new(LocalAnimationRenderer::new(workspace.path().join("renders"))),
        workspace.path().to_path_buf(),
    );
    let app = Application::new(job_store, checkpoint_store, engine, "worker-1");

    let job = app.create_job(&input_path.display().to_string(), "default").await.unwrap();
    let result = app.run_job(&job.id.to_string()).await;

    assert!(result.is_ok(), "job should complete via fallbacks: {result:?}");
    let report = app.status_job(&job.id.to_string()).await.unwrap();
    assert!(report.errors.iter().any(|e| e.used_fallback));
    assert_eq!(report.job.status, JobStatus::Degraded);
    assert!(report.job.degraded_stage_count > 0);
}

/// Scenario: the job-wide retry ceiling is exhausted before any single
/// stage's own `max_retries` would be. Stage 2 has both retries and a
/// fallback available, but a ceiling of `0` means the very first
/// recoverable failure already meets or exceeds it, so the stage runner
/// must force fatal termination without ever reaching stage 2's fallback.
#[tokio::test]
async fn total_retry_ceiling_forces_fatal_termination() {
    let workspace = tempfile::tempdir().unwrap();
    let input_path = write_style_and_input(workspace.path(), "default").await;

    let job_store = job_store().await;
    let checkpoint_store = checkpoint_store(workspace.path());
    let engine = engine_with_ceiling(
        job_store.clone(),
        checkpoint_store.clone(),
        Arc::new(AlwaysQuotaLlm),
        Arc::new(LocalAnimationRenderer::new(workspace.path().join("renders"))),
        workspace.path().to_path_buf(),
        0,
    );
    let app = Application::new(job_store, checkpoint_store, engine, "worker-1");

    let job = app.create_job(&input_path.display().to_string(), "default").await.unwrap();
    let result = app.run_job(&job.id.to_string()).await;

    assert!(result.is_err());
    let report = app.status_job(&job.id.to_string()).await.unwrap();
    assert_eq!(report.job.status, JobStatus::Error);
    assert!(!report.errors.iter().any(|e| e.used_fallback));
}

/// An `AnimationRenderer` that always fails regardless of quality, so even
/// stage 7's lowest-quality retry fallback can't rescue the job.
struct AlwaysFailingRenderer;

#[async_trait]
impl AnimationRenderer for AlwaysFailingRenderer {
    async fn render(&self, _script_path: &Path, _quality: RenderQuality) -> Result<PathBuf, PipelineError> {
        Err(PipelineError::render("renderer subprocess crashed"))
    }
}

/// Scenario: stage 7's render fails every time, at every quality. The job
/// must end in `Error`, never silently continuing to mux a nonexistent
/// video.
#[tokio::test]
async fn render_failure_is_fatal_with_no_fallback() {
    let workspace = tempfile::tempdir().unwrap();
    let input_path = write_style_and_input(workspace.path(), "default").await;

    let job_store = job_store().await;
    let checkpoint_store = checkpoint_store(workspace.path());
    let engine = engine_with_adapters(
        job_store.clone(),
        checkpoint_store.clone(),
        Arc::new(LocalLlmService),
        Arc::new(AlwaysFailingRenderer),
        workspace.path().to_path_buf(),
    );
    let app = Application::new(job_store, checkpoint_store, engine, "worker-1");

    let job = app.create_job(&input_path.display().to_string(), "default").await.unwrap();
    let result = app.run_job(&job.id.to_string()).await;

    assert!(result.is_err());
    let report = app.status_job(&job.id.to_string()).await.unwrap();
    assert_eq!(report.job.status, JobStatus::Error);
}

/// A renderer that writes a much larger placeholder file than
/// `LocalAnimationRenderer`, so the probed video duration comfortably
/// exceeds the narration audio and the engine's duration-alignment repair
/// has something to pad.
struct LongVideoRenderer {
    output_dir: PathBuf,
}

#[async_trait]
impl AnimationRenderer for LongVideoRenderer {
    async fn render(&self, script_path: &Path, quality: RenderQuality) -> Result<PathBuf, PipelineError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let output_path = self.output_dir.join(format!(
            "{}-{}.mp4",
            script_path.file_stem().and_then(|s| s.to_str()).unwrap_or("render"),
            quality.as_str()
        ));
        // 64 bytes probes to one second under `LocalMediaProbe`; a much
        // larger placeholder comfortably clears the short narration clip.
        tokio::fs::write(&output_path, vec![0u8; 64 * 20]).await?;
        Ok(output_path)
    }
}

/// Scenario: the rendered video runs noticeably longer than the narration
/// audio. `PipelineEngine::align_durations` must pad the audio with a
/// trailing silence clip before the pre-merge gate runs, so the job still
/// reaches `Done` instead of being rejected for misaligned durations.
#[tokio::test]
async fn short_audio_is_padded_with_silence_before_the_gate() {
    let workspace = tempfile::tempdir().unwrap();
    let input_path = write_style_and_input(workspace.path(), "default").await;

    let job_store = job_store().await;
    let checkpoint_store = checkpoint_store(workspace.path());
    let engine = engine_with_adapters(
        job_store.clone(),
        checkpoint_store.clone(),
        Arc::new(LocalLlmService),
        Arc::new(LongVideoRenderer {
            output_dir: workspace.path().join("renders"),
        }),
        workspace.path().to_path_buf(),
    );
    let app = Application::new(job_store, checkpoint_store, engine, "worker-1");

    let job = app.create_job(&input_path.display().to_string(), "default").await.unwrap();
    let context = app.run_job(&job.id.to_string()).await.unwrap();

    assert!(context.final_video_path.is_some());
    let video = context.video_duration.unwrap();
    let audio = context.audio_duration.unwrap();
    assert!(audio + Duration::from_millis(500) >= video, "audio should have been padded up to the video length");
}

/// Scenario: a job crashed after stage 4 with a checkpoint on disk but its
/// store record left at stage 5. Resuming must pick the checkpointed
/// context back up rather than starting from scratch, and carry the run to
/// completion.
#[tokio::test]
async fn resume_continues_from_the_last_checkpoint() {
    let workspace = tempfile::tempdir().unwrap();
    let input_path = write_style_and_input(workspace.path(), "default").await;

    let job_store = job_store().await;
    let checkpoint_store = checkpoint_store(workspace.path());

    let mut job = Job::new(input_path.display().to_string(), "default");
    job.begin_stage(StageOrder::new(5).unwrap());
    job_store.create(&job).await.unwrap();
    job_store.update(&job).await.unwrap();

    let mut crashed_context = JobContext::new();
    crashed_context.style_prompts = Some("narrate calmly".to_string());
    crashed_context.normalized_markdown = Some("# Title\n\nSome body text about a topic.\n".to_string());
    crashed_context.summary = Some("a summary".to_string());
    crashed_context.base_script = Some("[Scene 1] hello".to_string());
    crashed_context.image_plan.push(mdvid_domain::entities::ImagePlanEntry {
        scene_index: 0,
        search_query: "topic".to_string(),
        layout_hint: "full-bleed".to_string(),
    });
    checkpoint_store
        .save(job.id, StageOrder::new(4).unwrap(), &crashed_context)
        .await
        .unwrap();

    let engine = engine_with_adapters(
        job_store.clone(),
        checkpoint_store.clone(),
        Arc::new(LocalLlmService),
        Arc::new(LocalAnimationRenderer::new(workspace.path().join("renders"))),
        workspace.path().to_path_buf(),
    );
    let app = Application::new(job_store, checkpoint_store, engine, "worker-1");

    let context = app.resume_job(&job.id.to_string()).await.unwrap();

    assert!(context.final_video_path.is_some());
    // The resumed run never re-derived the summary/base_script the crash
    // had already produced; they survive unchanged into the final context.
    assert_eq!(context.summary.as_deref(), Some("a summary"));
}

/// Scenario: cancellation is observed before a stage starts. The engine
/// must stop immediately, mark the job `Error`, and return
/// `PipelineError::Cancelled` rather than continuing to execute stages.
#[tokio::test]
async fn cancellation_is_observed_and_halts_the_run() {
    let workspace = tempfile::tempdir().unwrap();
    let input_path = write_style_and_input(workspace.path(), "default").await;

    let job_store = job_store().await;
    let checkpoint_store = checkpoint_store(workspace.path());
    let engine = engine_with_adapters(
        job_store.clone(),
        checkpoint_store.clone(),
        Arc::new(LocalLlmService),
        Arc::new(LocalAnimationRenderer::new(workspace.path().join("renders"))),
        workspace.path().to_path_buf(),
    );

    let job = Job::new(input_path.display().to_string(), "default");
    job_store.create(&job).await.unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = engine.run(job.clone(), JobContext::new(), cancel).await;
    assert!(matches!(result, Err(PipelineError::Cancelled)));

    let stored = job_store.get(job.id).await.unwrap();
    assert_eq!(stored.status, JobStatus::Error);
}
