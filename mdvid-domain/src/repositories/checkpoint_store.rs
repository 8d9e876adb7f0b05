// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Checkpoint Store Port
//!
//! Durable, per-`(job, stage)` snapshots of [`JobContext`]. The Stage Runner
//! writes one after every successful stage and reads the most recent one
//! back when rolling back a failed stage or resuming a crashed job.

use crate::entities::{CheckpointData, JobContext};
use crate::error::PipelineError;
use crate::value_objects::{JobId, StageOrder};
use async_trait::async_trait;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Persist a context snapshot for `job_id` at `stage`.
    async fn save(&self, job_id: JobId, stage: StageOrder, context: &JobContext) -> Result<(), PipelineError>;

    /// Load the snapshot written for `job_id` at exactly `stage`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::CheckpointNotFound`] if no snapshot exists
    /// for that exact stage.
    async fn load(&self, job_id: JobId, stage: StageOrder) -> Result<CheckpointData, PipelineError>;

    /// Load the most recent snapshot written for `job_id`, regardless of
    /// stage. Used to resume a job after a crash.
    async fn load_latest(&self, job_id: JobId) -> Result<Option<CheckpointData>, PipelineError>;

    /// Delete every snapshot belonging to `job_id`, e.g. when the job is
    /// deleted.
    async fn delete_all(&self, job_id: JobId) -> Result<(), PipelineError>;
}
