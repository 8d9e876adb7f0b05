// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Job Context
//!
//! `JobContext` is the transient, per-job working state threaded through the
//! eleven stages. Unlike [`crate::entities::job::Job`] it is not queried on
//! its own; it is only ever read or replaced wholesale as a
//! [`crate::entities::checkpoint::Checkpoint`] snapshot. Fields are named
//! per stage output rather than a generic `HashMap<String, String>`, since
//! each stage's output has its own shape.

use crate::value_objects::{JobId, TokenUsage};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One planned image: the query to search for, and where it belongs in the
/// animation layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePlanEntry {
    pub scene_index: u32,
    pub search_query: String,
    pub layout_hint: String,
}

/// A fetched image, ready to be composited into the script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedImage {
    pub scene_index: u32,
    pub source_url: String,
    pub local_path: String,
}

/// One synthesized narration audio clip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioClip {
    pub scene_index: u32,
    pub local_path: String,
    pub duration: Duration,
}

/// Transient per-job state, one field set per stage output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobContext {
    /// Stage 0: style prompt bundle, loaded verbatim.
    pub style_prompts: Option<String>,
    /// Stage 1: normalized/validated Markdown source.
    pub normalized_markdown: Option<String>,
    /// Stage 2: synthesized document summary.
    pub summary: Option<String>,
    /// Stage 3: base animation script, pre-image-enhancement.
    pub base_script: Option<String>,
    /// Stage 4: planned image slots.
    pub image_plan: Vec<ImagePlanEntry>,
    /// Stage 5: fetched images, one per plan entry that succeeded.
    pub fetched_images: Vec<FetchedImage>,
    /// Stage 6: animation script enhanced with image references.
    pub enhanced_script: Option<String>,
    /// Stage 7: rendered silent video file path.
    pub silent_video_path: Option<String>,
    /// Stage 8: narration text, one line per scene.
    pub narration_text: Option<String>,
    /// Stage 9: synthesized narration audio clips.
    pub audio_clips: Vec<AudioClip>,
    /// Stage 10: final muxed output video path.
    pub final_video_path: Option<String>,
    /// Probed duration of the silent video, populated by the pre-merge gate.
    pub video_duration: Option<Duration>,
    /// Probed total duration of the audio clips, populated by the
    /// pre-merge gate.
    pub audio_duration: Option<Duration>,
    /// LLM token spend accumulated by the current stage, not yet folded
    /// into the owning `Job`'s running total. The Pipeline Engine drains
    /// this into `Job::record_tokens` after each stage and resets it.
    pub pending_token_usage: TokenUsage,
}

impl JobContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether stage 7's silent video render has completed.
    pub fn has_silent_video(&self) -> bool {
        self.silent_video_path.is_some()
    }

    /// Whether stage 9 produced at least one narration audio clip.
    pub fn has_audio(&self) -> bool {
        !self.audio_clips.is_empty()
    }
}

/// Serialized `(JobId, stage_index)`-addressed snapshot of a `JobContext`,
/// as written by [`crate::repositories::checkpoint_store::CheckpointStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointData {
    pub job_id: JobId,
    pub stage_index: u32,
    pub stage_name: String,
    pub context: JobContext,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_context_has_no_outputs() {
        let ctx = JobContext::new();
        assert!(!ctx.has_silent_video());
        assert!(!ctx.has_audio());
        assert!(ctx.image_plan.is_empty());
    }

    #[test]
    fn context_round_trips_through_json() {
        let mut ctx = JobContext::new();
        ctx.summary = Some("a summary".to_string());
        ctx.audio_clips.push(AudioClip {
            scene_index: 0,
            local_path: "/tmp/a.wav".to_string(),
            duration: Duration::from_secs(3),
        });

        let json = serde_json::to_string(&ctx).unwrap();
        let parsed: JobContext = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.summary.as_deref(), Some("a summary"));
        assert!(parsed.has_audio());
    }
}
