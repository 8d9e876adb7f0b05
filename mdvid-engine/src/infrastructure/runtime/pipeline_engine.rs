// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipeline Engine
//!
//! Drives one job through the eleven registered stages in order,
//! delegating each stage's execution to the [`StageRunner`] and persisting
//! job/error state via the `JobStore` between stages. The pre-merge
//! validation gate runs immediately after stage 10 (mux) completes, and
//! decides between `done` and `degraded` — it never fails the job outright.

use super::stage_runner::{StageOutcome, StageRunner};
use crate::infrastructure::adapters::MediaProbe;
use mdvid_domain::entities::{AudioClip, Job, JobContext, JobStatus};
use mdvid_domain::error::PipelineError;
use mdvid_domain::repositories::{CheckpointStore, JobStore, StageAdapter};
use mdvid_domain::services::{pre_merge_gate, StageRegistry};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct PipelineEngine {
    registry: StageRegistry,
    stage_adapters: HashMap<u32, Arc<dyn StageAdapter>>,
    job_store: Arc<dyn JobStore>,
    checkpoint_store: Arc<dyn CheckpointStore>,
    stage_runner: StageRunner,
    media_probe: Arc<dyn MediaProbe>,
    workspace_root: PathBuf,
}

impl PipelineEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: StageRegistry,
        stage_adapters: HashMap<u32, Arc<dyn StageAdapter>>,
        job_store: Arc<dyn JobStore>,
        checkpoint_store: Arc<dyn CheckpointStore>,
        backoff_base: std::time::Duration,
        backoff_cap: std::time::Duration,
        total_retry_ceiling: u32,
        media_probe: Arc<dyn MediaProbe>,
        workspace_root: PathBuf,
    ) -> Self {
        PipelineEngine {
            registry,
            stage_adapters,
            job_store,
            checkpoint_store: checkpoint_store.clone(),
            stage_runner: StageRunner::new(checkpoint_store, backoff_base, backoff_cap, total_retry_ceiling),
            media_probe,
            workspace_root,
        }
    }

    /// Probe the rendered video's duration if not already known, then pad
    /// the narration audio with a trailing silence clip if it falls short
    /// of the video by more than the alignment tolerance. Run immediately
    /// before stage 10's mux adapter executes; the pre-merge gate itself
    /// runs after, once the mux has actually produced (or failed to
    /// produce) a final video.
    async fn align_durations(&self, job: &Job, context: &mut JobContext) -> Result<(), PipelineError> {
        if context.video_duration.is_none() {
            if let Some(path) = context.silent_video_path.as_deref() {
                context.video_duration = Some(self.media_probe.duration(Path::new(path)).await?);
            }
        }

        let (Some(video), Some(audio)) = (context.video_duration, context.audio_duration) else {
            return Ok(());
        };
        if video <= audio || video - audio <= pre_merge_gate::DURATION_ALIGNMENT_TOLERANCE {
            return Ok(());
        }

        let gap = video - audio;
        let audio_dir = self.workspace_root.join(job.id.to_string()).join("audio");
        fs::create_dir_all(&audio_dir).await?;
        let silence_path = audio_dir.join(format!("silence-{}.pcm", context.audio_clips.len()));
        fs::write(&silence_path, Vec::<u8>::new()).await?;

        context.audio_clips.push(AudioClip {
            scene_index: context.audio_clips.len() as u32,
            local_path: silence_path.display().to_string(),
            duration: gap,
        });
        context.audio_duration = Some(audio + gap);
        Ok(())
    }

    /// Run `job` from its current stage through stage 10, or until a fatal
    /// failure or cancellation. Returns the final `JobContext`.
    pub async fn run(
        &self,
        mut job: Job,
        mut context: JobContext,
        cancel: CancellationToken,
    ) -> Result<JobContext, PipelineError> {
        let mut stage = job.current_stage;

        loop {
            if cancel.is_cancelled() {
                job.mark_error();
                let _ = self.job_store.update(&job).await;
                return Err(PipelineError::Cancelled);
            }

            let descriptor = self.registry.get(stage);
            let adapter = self
                .stage_adapters
                .get(&stage.value())
                .ok_or_else(|| PipelineError::Unknown(format!("no adapter registered for stage {stage}")))?;

            job.begin_stage(stage);
            let _ = self.job_store.update(&job).await;

            if stage.value() == 10 {
                self.align_durations(&job, &mut context).await?;
            }

            info!(job_id = %job.id, stage = descriptor.name, "executing stage");
            let (outcome, records) = self
                .stage_runner
                .run(adapter.as_ref(), descriptor, &mut job, context, &cancel)
                .await;

            for record in &records {
                if let Err(e) = self.job_store.append_error(job.id, record).await {
                    warn!(job_id = %job.id, error = %e, "failed to append error record");
                }
            }

            context = match outcome {
                StageOutcome::Completed(mut updated_context) => {
                    job.record_tokens(updated_context.pending_token_usage);
                    updated_context.pending_token_usage = Default::default();
                    job.mark_stage_complete(stage);
                    let _ = self.job_store.mark_stage_complete(job.id, stage).await;
                    updated_context
                }
                StageOutcome::CompletedViaFallback(mut updated_context) => {
                    job.record_tokens(updated_context.pending_token_usage);
                    updated_context.pending_token_usage = Default::default();
                    job.mark_stage_complete(stage);
                    let _ = self.job_store.mark_stage_complete(job.id, stage).await;
                    job.mark_degraded();
                    updated_context
                }
                StageOutcome::Degraded(mut updated_context) => {
                    job.record_tokens(updated_context.pending_token_usage);
                    updated_context.pending_token_usage = Default::default();
                    job.mark_degraded();
                    updated_context
                }
                StageOutcome::Failed(e) => {
                    job.mark_error();
                    let _ = self.job_store.update(&job).await;
                    return Err(e);
                }
            };

            if stage.value() == 10 {
                let checklist = pre_merge_gate::evaluate(&context);
                if let Some(path) = context.final_video_path.clone() {
                    job.set_final_video_path(path);
                } else if let Some(path) = context.silent_video_path.clone() {
                    job.set_final_video_path(path);
                }
                if !checklist.video_ready() {
                    warn!(job_id = %job.id, failing = ?checklist.failing_predicates(), "pre-merge checklist incomplete; job will finish degraded");
                    job.mark_degraded();
                }
            }
            let _ = self.job_store.update(&job).await;

            match stage.next() {
                Some(next_stage) => stage = next_stage,
                None => {
                    if job.status != JobStatus::Degraded {
                        job.mark_done();
                    }
                    self.job_store.update(&job).await?;
                    self.checkpoint_store.delete_all(job.id).await.ok();
                    return Ok(context);
                }
            }
        }
    }

    /// Resume a job from its most recent checkpoint (or fresh, if none
    /// exists yet) at its recorded `current_stage`.
    pub async fn resume(&self, job: Job, cancel: CancellationToken) -> Result<JobContext, PipelineError> {
        let context = match self.checkpoint_store.load_latest(job.id).await? {
            Some(checkpoint) => checkpoint.context,
            None => JobContext::new(),
        };
        self.run(job, context, cancel).await
    }
}

