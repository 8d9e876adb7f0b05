// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pre-Merge Validation Gate
//!
//! A pure function over an already-populated [`JobContext`]: no I/O, no
//! async. Duration probing happens upstream (the engine's `MediaProbe`
//! adapter populates `video_duration`/`audio_duration` on the context, and
//! repairs a short audio track by padding it with silence, before this gate
//! ever runs) so the decision logic itself stays a synchronous, pure domain
//! service — matching how this codebase's other domain services operate
//! only on already-loaded data.

use crate::entities::JobContext;
use std::time::Duration;

/// Tolerance for audio/video duration alignment: within this much, the two
/// tracks are considered synced.
pub const DURATION_ALIGNMENT_TOLERANCE: Duration = Duration::from_millis(500);

/// The named boolean predicates evaluated before a job's silent video and
/// narration audio are allowed to be muxed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checklist {
    pub input_validated: bool,
    pub summary_present: bool,
    pub script_present: bool,
    pub images_resolved: bool,
    pub images_integrated: bool,
    pub silent_video_present: bool,
    pub narration_present: bool,
    pub audio_present: bool,
    pub durations_aligned: bool,
    pub audio_integrated: bool,
}

impl Checklist {
    /// `video_ready` is the conjunction of every other predicate: the stage
    /// 10 mux step only runs when this is `true`.
    pub fn video_ready(&self) -> bool {
        self.input_validated
            && self.summary_present
            && self.script_present
            && self.images_resolved
            && self.images_integrated
            && self.silent_video_present
            && self.narration_present
            && self.audio_present
            && self.durations_aligned
            && self.audio_integrated
    }

    /// Names of every predicate that currently evaluates `false`, for
    /// diagnostics when a job gets stuck at the gate.
    pub fn failing_predicates(&self) -> Vec<&'static str> {
        let mut failing = Vec::new();
        if !self.input_validated {
            failing.push("input_validated");
        }
        if !self.summary_present {
            failing.push("summary_present");
        }
        if !self.script_present {
            failing.push("script_present");
        }
        if !self.images_resolved {
            failing.push("images_resolved");
        }
        if !self.images_integrated {
            failing.push("images_integrated");
        }
        if !self.silent_video_present {
            failing.push("silent_video_present");
        }
        if !self.narration_present {
            failing.push("narration_present");
        }
        if !self.audio_present {
            failing.push("audio_present");
        }
        if !self.durations_aligned {
            failing.push("durations_aligned");
        }
        if !self.audio_integrated {
            failing.push("audio_integrated");
        }
        failing
    }
}

/// Whether two durations are close enough to count as aligned for muxing.
pub fn durations_aligned(video: Duration, audio: Duration) -> bool {
    let diff = if video > audio { video - audio } else { audio - video };
    diff <= DURATION_ALIGNMENT_TOLERANCE
}

/// Evaluate the checklist against a context. Assumes any audio-short-of-
/// video repair (silence padding) has already happened upstream and is
/// reflected in `context.audio_duration`.
pub fn evaluate(context: &JobContext) -> Checklist {
    let durations_aligned = match (context.video_duration, context.audio_duration) {
        (Some(v), Some(a)) => durations_aligned(v, a),
        _ => false,
    };

    let images_integrated = context.fetched_images.is_empty()
        || (context.enhanced_script.is_some() && context.enhanced_script != context.base_script);

    let audio_integrated = context.final_video_path.is_some()
        && context.audio_duration.map(|d| d > Duration::ZERO).unwrap_or(false);

    Checklist {
        input_validated: context.normalized_markdown.is_some(),
        summary_present: context.summary.is_some(),
        script_present: context.base_script.is_some(),
        images_resolved: context.image_plan.is_empty() || !context.fetched_images.is_empty(),
        images_integrated,
        silent_video_present: context.has_silent_video(),
        narration_present: context.narration_text.is_some(),
        audio_present: context.has_audio(),
        durations_aligned,
        audio_integrated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{AudioClip, FetchedImage};

    fn ready_context() -> JobContext {
        let mut ctx = JobContext::new();
        ctx.normalized_markdown = Some("# doc".to_string());
        ctx.summary = Some("summary".to_string());
        ctx.base_script = Some("script".to_string());
        ctx.fetched_images.push(FetchedImage {
            scene_index: 0,
            source_url: "https://example.com/a.png".to_string(),
            local_path: "/tmp/a.png".to_string(),
        });
        ctx.enhanced_script = Some("enhanced".to_string());
        ctx.silent_video_path = Some("/tmp/video.mp4".to_string());
        ctx.narration_text = Some("narration".to_string());
        ctx.audio_clips.push(AudioClip {
            scene_index: 0,
            local_path: "/tmp/a.wav".to_string(),
            duration: Duration::from_secs(10),
        });
        ctx.video_duration = Some(Duration::from_secs(10));
        ctx.audio_duration = Some(Duration::from_secs(10));
        ctx.final_video_path = Some("/tmp/final.mp4".to_string());
        ctx
    }

    #[test]
    fn fully_populated_context_is_video_ready() {
        let checklist = evaluate(&ready_context());
        assert!(checklist.video_ready());
        assert!(checklist.failing_predicates().is_empty());
    }

    #[test]
    fn missing_audio_blocks_video_ready() {
        let mut ctx = ready_context();
        ctx.audio_clips.clear();
        ctx.audio_duration = None;
        let checklist = evaluate(&ctx);
        assert!(!checklist.video_ready());
        assert!(checklist.failing_predicates().contains(&"audio_present"));
    }

    #[test]
    fn misaligned_durations_block_video_ready() {
        let mut ctx = ready_context();
        ctx.audio_duration = Some(Duration::from_secs(3));
        let checklist = evaluate(&ctx);
        assert!(!checklist.video_ready());
        assert!(checklist.failing_predicates().contains(&"durations_aligned"));
    }

    #[test]
    fn durations_within_tolerance_are_aligned() {
        assert!(durations_aligned(Duration::from_millis(10_000), Duration::from_millis(10_400)));
        assert!(!durations_aligned(Duration::from_millis(10_000), Duration::from_millis(11_000)));
    }

    #[test]
    fn unenhanced_script_with_images_blocks_images_integrated() {
        let mut ctx = ready_context();
        ctx.enhanced_script = ctx.base_script.clone();
        let checklist = evaluate(&ctx);
        assert!(!checklist.images_integrated);
        assert!(checklist.failing_predicates().contains(&"images_integrated"));
    }

    #[test]
    fn no_fetched_images_trivially_satisfies_images_integrated() {
        let mut ctx = ready_context();
        ctx.fetched_images.clear();
        ctx.enhanced_script = ctx.base_script.clone();
        let checklist = evaluate(&ctx);
        assert!(checklist.images_integrated);
    }

    #[test]
    fn missing_final_video_blocks_audio_integrated() {
        let mut ctx = ready_context();
        ctx.final_video_path = None;
        let checklist = evaluate(&ctx);
        assert!(!checklist.audio_integrated);
        assert!(checklist.failing_predicates().contains(&"audio_integrated"));
        assert!(!checklist.video_ready());
    }

    #[test]
    fn zero_audio_duration_blocks_audio_integrated() {
        let mut ctx = ready_context();
        ctx.audio_duration = Some(Duration::ZERO);
        let checklist = evaluate(&ctx);
        assert!(!checklist.audio_integrated);
    }
}
