// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Stages 7, 9, and 10: rendering the silent video, synthesizing narration
//! audio, and muxing the two together — the three stages that produce the
//! artifacts the pre-merge gate checks.

use crate::infrastructure::adapters::{AnimationRenderer, AvMuxer, MediaProbe, RenderQuality, SpeechSynthesizer};
use async_trait::async_trait;
use mdvid_domain::entities::{AudioClip, Job, JobContext};
use mdvid_domain::error::PipelineError;
use mdvid_domain::repositories::{CancellationSignal, StageAdapter};
use mdvid_domain::value_objects::StageOrder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Semaphore;

/// Upper bound on concurrent narration-synthesis requests in flight at once,
/// matching the fetch stage's own cap.
const MAX_CONCURRENT_SYNTHESES: usize = 6;

/// Stage 7: render the enhanced script into a silent video via the
/// `AnimationRenderer` subprocess adapter. Falls back to re-rendering at a
/// configured lower quality; if that also fails, the stage is fatal.
pub struct RenderSilentVideoStage {
    renderer: Arc<dyn AnimationRenderer>,
    workspace_root: PathBuf,
    fallback_quality: RenderQuality,
}

impl RenderSilentVideoStage {
    pub fn new(renderer: Arc<dyn AnimationRenderer>, workspace_root: PathBuf, fallback_quality: impl AsRef<str>) -> Self {
        RenderSilentVideoStage {
            renderer,
            workspace_root,
            fallback_quality: RenderQuality::parse(fallback_quality.as_ref()),
        }
    }

    fn script_path(&self, job: &Job, context: &JobContext) -> Result<(PathBuf, String), PipelineError> {
        let enhanced_script = context
            .enhanced_script
            .clone()
            .ok_or_else(|| PipelineError::Unknown("render stage ran before script enhancement".to_string()))?;
        let script_dir = self.workspace_root.join(job.id.to_string());
        Ok((script_dir.join("enhanced_script.txt"), enhanced_script))
    }
}

#[async_trait]
impl StageAdapter for RenderSilentVideoStage {
    fn order(&self) -> StageOrder {
        StageOrder::new(7).expect("stage 7 is always valid")
    }

    fn name(&self) -> &'static str {
        "render_silent_video"
    }

    async fn execute(
        &self,
        job: &Job,
        mut context: JobContext,
        cancel: &dyn CancellationSignal,
    ) -> Result<JobContext, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let (script_path, enhanced_script) = self.script_path(job, &context)?;
        fs::create_dir_all(script_path.parent().expect("script path has a parent")).await?;
        fs::write(&script_path, enhanced_script).await?;

        let video_path = self.renderer.render(&script_path, RenderQuality::High).await?;
        context.silent_video_path = Some(video_path.display().to_string());
        Ok(context)
    }

    async fn fallback(&self, job: &Job, mut context: JobContext) -> Result<JobContext, PipelineError> {
        let (script_path, enhanced_script) = self.script_path(job, &context)?;
        fs::create_dir_all(script_path.parent().expect("script path has a parent")).await?;
        fs::write(&script_path, enhanced_script).await?;

        let video_path = self.renderer.render(&script_path, self.fallback_quality).await?;
        context.silent_video_path = Some(video_path.display().to_string());
        Ok(context)
    }
}

/// Stage 9: synthesize one narration audio clip per scene. Degradable with
/// a fallback: synthesize a single clip covering the whole narration text
/// as one scene rather than per-scene splitting.
pub struct SynthesizeAudioClipsStage {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    probe: Arc<dyn MediaProbe>,
    default_voice_id: String,
}

impl SynthesizeAudioClipsStage {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, probe: Arc<dyn MediaProbe>, default_voice_id: String) -> Self {
        SynthesizeAudioClipsStage {
            synthesizer,
            probe,
            default_voice_id,
        }
    }

    async fn probe_clip(&self, path: &Path, scene_index: u32) -> Result<AudioClip, PipelineError> {
        let duration = self.probe.duration(path).await?;
        Ok(AudioClip {
            scene_index,
            local_path: path.display().to_string(),
            duration,
        })
    }
}

#[async_trait]
impl StageAdapter for SynthesizeAudioClipsStage {
    fn order(&self) -> StageOrder {
        StageOrder::new(9).expect("stage 9 is always valid")
    }

    fn name(&self) -> &'static str {
        "synthesize_audio_clips"
    }

    async fn execute(
        &self,
        _job: &Job,
        mut context: JobContext,
        cancel: &dyn CancellationSignal,
    ) -> Result<JobContext, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let narration = context
            .narration_text
            .as_deref()
            .ok_or_else(|| PipelineError::Unknown("audio stage ran before narration text".to_string()))?;

        let lines: Vec<String> = narration
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect();

        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_SYNTHESES));
        let mut tasks = Vec::new();
        for (index, line) in lines.into_iter().enumerate() {
            let synthesizer = self.synthesizer.clone();
            let probe = self.probe.clone();
            let voice = self.default_voice_id.clone();
            let semaphore = semaphore.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                let path = synthesizer.synthesize(&line, &voice).await?;
                let duration = probe.duration(&path).await?;
                Ok::<AudioClip, PipelineError>(AudioClip {
                    scene_index: index as u32,
                    local_path: path.display().to_string(),
                    duration,
                })
            }));
        }

        let mut clips = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(result) => clips.push(result?),
                Err(e) => return Err(PipelineError::Unknown(format!("audio synthesis task panicked: {e}"))),
            }
        }
        clips.sort_by_key(|c| c.scene_index);

        let total: std::time::Duration = clips.iter().map(|c| c.duration).sum();
        context.audio_clips = clips;
        context.audio_duration = Some(total);
        Ok(context)
    }

    async fn fallback(&self, _job: &Job, mut context: JobContext) -> Result<JobContext, PipelineError> {
        let narration = context.narration_text.clone().unwrap_or_default();
        let path = self.synthesizer.synthesize(&narration, &self.default_voice_id).await?;
        let clip = self.probe_clip(&path, 0).await?;
        context.audio_duration = Some(clip.duration);
        context.audio_clips = vec![clip];
        Ok(context)
    }
}

/// Stage 10: mux the silent video with the narration audio into the final
/// artifact. Probes both durations first so the pre-merge gate (which runs
/// just after this stage) sees an up-to-date video duration. Falls back to
/// keeping the silent video as the final output when muxing itself fails.
pub struct MuxAudioVideoStage {
    muxer: Arc<dyn AvMuxer>,
    probe: Arc<dyn MediaProbe>,
    workspace_root: PathBuf,
}

impl MuxAudioVideoStage {
    pub fn new(muxer: Arc<dyn AvMuxer>, probe: Arc<dyn MediaProbe>, workspace_root: PathBuf) -> Self {
        MuxAudioVideoStage {
            muxer,
            probe,
            workspace_root,
        }
    }

    /// Concatenate every narration clip, in scene order, into one combined
    /// audio track file under the job's workspace directory.
    async fn combine_audio_track(&self, job: &Job, context: &JobContext) -> Result<PathBuf, PipelineError> {
        let mut clips = context.audio_clips.clone();
        if clips.is_empty() {
            return Err(PipelineError::Unknown("mux stage ran before audio synthesis".to_string()));
        }
        clips.sort_by_key(|c| c.scene_index);

        let audio_dir = self.workspace_root.join(job.id.to_string());
        fs::create_dir_all(&audio_dir).await?;
        let combined_path = audio_dir.join("combined_narration.pcm");

        let mut combined = Vec::new();
        for clip in &clips {
            combined.extend(fs::read(&clip.local_path).await?);
        }
        fs::write(&combined_path, combined).await?;
        Ok(combined_path)
    }
}

#[async_trait]
impl StageAdapter for MuxAudioVideoStage {
    fn order(&self) -> StageOrder {
        StageOrder::new(10).expect("stage 10 is always valid")
    }

    fn name(&self) -> &'static str {
        "mux_audio_video"
    }

    async fn execute(
        &self,
        job: &Job,
        mut context: JobContext,
        cancel: &dyn CancellationSignal,
    ) -> Result<JobContext, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let video_path = context
            .silent_video_path
            .as_deref()
            .ok_or_else(|| PipelineError::Unknown("mux stage ran before video render".to_string()))?;
        let video_path = Path::new(video_path).to_path_buf();

        let audio_path = self.combine_audio_track(job, &context).await?;

        context.video_duration = Some(self.probe.duration(&video_path).await?);

        let final_path = self.muxer.mux(&video_path, &audio_path).await?;
        context.final_video_path = Some(final_path.display().to_string());
        Ok(context)
    }

    async fn fallback(&self, _job: &Job, mut context: JobContext) -> Result<JobContext, PipelineError> {
        let silent_video = context
            .silent_video_path
            .clone()
            .ok_or_else(|| PipelineError::Unknown("mux fallback ran before video render".to_string()))?;
        context.final_video_path = Some(silent_video);
        Ok(context)
    }
}
