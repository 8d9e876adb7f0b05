// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Job Entity
//!
//! `Job` is the durable record of one markdown-to-video conversion. It
//! survives process restarts via the [`crate::repositories::job_store::JobStore`]
//! and is the only thing the engine trusts across a crash: everything
//! transient lives in [`crate::entities::job_context::JobContext`] instead.

use crate::datetime_serde;
use crate::value_objects::{JobId, StageOrder, TokenUsage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a job. Transitions are monotonic: once `Done`,
/// `Error`, or `Degraded`, a job never returns to `Pending`/`Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Error,
    Degraded,
}

impl JobStatus {
    /// Whether this status represents a terminal (no further stage
    /// execution will happen) state.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Error | JobStatus::Degraded)
    }
}

/// A single markdown-to-video conversion job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub current_stage: StageOrder,
    pub input_path: String,
    pub style_name: String,
    pub token_usage: TokenUsage,
    pub degraded_stage_count: u32,
    /// Running count of every retry attempt spent across every stage of
    /// this job's whole run, independent of any single stage's own retry
    /// budget. Checked against `EngineConfig::total_retry_ceiling`.
    pub total_retry_count: u32,
    /// Indices of every stage whose checkpoint has been durably saved.
    /// Grows monotonically; never cleared except by a fresh `Job::new`.
    pub completed_stages: Vec<u32>,
    /// The final muxed video's path once the job reaches `Done` or
    /// `Degraded` via the stage-10 "keep silent video as final" fallback.
    pub final_video_path: Option<String>,
    #[serde(with = "datetime_serde")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "datetime_serde")]
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a freshly-submitted job at stage 0, status `Pending`.
    pub fn new(input_path: impl Into<String>, style_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Job {
            id: JobId::generate(),
            status: JobStatus::Pending,
            current_stage: StageOrder::first(),
            input_path: input_path.into(),
            style_name: style_name.into(),
            token_usage: TokenUsage::default(),
            degraded_stage_count: 0,
            total_retry_count: 0,
            completed_stages: Vec::new(),
            final_video_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance to `Processing` at the given stage. Idempotent if already
    /// processing that stage.
    pub fn begin_stage(&mut self, stage: StageOrder) {
        self.status = JobStatus::Processing;
        self.current_stage = stage;
        self.touch();
    }

    /// Mark the job terminally successful.
    pub fn mark_done(&mut self) {
        self.status = JobStatus::Done;
        self.touch();
    }

    /// Mark the job terminally failed.
    pub fn mark_error(&mut self) {
        self.status = JobStatus::Error;
        self.touch();
    }

    /// Mark the job as completed with a degraded stage. `status` only moves
    /// to `Degraded` if it isn't already a harder terminal state.
    pub fn mark_degraded(&mut self) {
        if self.status != JobStatus::Error {
            self.status = JobStatus::Degraded;
        }
        self.degraded_stage_count += 1;
        self.touch();
    }

    pub fn record_tokens(&mut self, usage: TokenUsage) {
        self.token_usage.add(usage);
        self.touch();
    }

    /// Spend one unit of the job-wide retry ceiling. Called by the stage
    /// runner once per retry, across every stage, not just the one
    /// currently executing.
    pub fn record_retry(&mut self) {
        self.total_retry_count += 1;
        self.touch();
    }

    /// Record that `stage`'s checkpoint now exists durably. Idempotent.
    pub fn mark_stage_complete(&mut self, stage: StageOrder) {
        let value = stage.value();
        if !self.completed_stages.contains(&value) {
            self.completed_stages.push(value);
        }
        self.touch();
    }

    pub fn has_completed_stage(&self, stage: StageOrder) -> bool {
        self.completed_stages.contains(&stage.value())
    }

    /// Record the final muxed (or, via stage 10's fallback, silent) video
    /// path once the job reaches a terminal stage-10 outcome.
    pub fn set_final_video_path(&mut self, path: impl Into<String>) {
        self.final_video_path = Some(path.into());
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_starts_pending_at_stage_zero() {
        let job = Job::new("doc.md", "default");
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.current_stage.value(), 0);
    }

    #[test]
    fn mark_done_is_terminal() {
        let mut job = Job::new("doc.md", "default");
        job.mark_done();
        assert!(job.status.is_terminal());
    }

    #[test]
    fn mark_degraded_does_not_override_error() {
        let mut job = Job::new("doc.md", "default");
        job.mark_error();
        job.mark_degraded();
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.degraded_stage_count, 1);
    }

    #[test]
    fn record_tokens_accumulates() {
        let mut job = Job::new("doc.md", "default");
        job.record_tokens(TokenUsage::new(10, 5));
        job.record_tokens(TokenUsage::new(1, 1));
        assert_eq!(job.token_usage.total(), 17);
    }

    #[test]
    fn record_retry_increments_total_count() {
        let mut job = Job::new("doc.md", "default");
        job.record_retry();
        job.record_retry();
        assert_eq!(job.total_retry_count, 2);
    }

    #[test]
    fn mark_stage_complete_is_idempotent() {
        let mut job = Job::new("doc.md", "default");
        let stage = StageOrder::new(3).unwrap();
        assert!(!job.has_completed_stage(stage));
        job.mark_stage_complete(stage);
        job.mark_stage_complete(stage);
        assert!(job.has_completed_stage(stage));
        assert_eq!(job.completed_stages, vec![3]);
    }

    #[test]
    fn set_final_video_path_populates_field() {
        let mut job = Job::new("doc.md", "default");
        assert!(job.final_video_path.is_none());
        job.set_final_video_path("/out/final.mp4");
        assert_eq!(job.final_video_path.as_deref(), Some("/out/final.mp4"));
    }
}
