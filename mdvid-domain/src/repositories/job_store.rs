// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Job Store Port
//!
//! Durable CRUD access to [`Job`] records and their [`ErrorRecord`] history.
//! The default production adapter is a SQLite-backed implementation in the
//! infrastructure layer; this trait is the seam that lets the engine and the
//! domain's own tests swap in an in-memory store.

use crate::entities::{ErrorRecord, Job, JobStatus};
use crate::error::PipelineError;
use crate::value_objects::{JobId, StageOrder};
use async_trait::async_trait;
use std::time::Duration;

/// Durable storage for jobs and their error history.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a brand new job record.
    async fn create(&self, job: &Job) -> Result<(), PipelineError>;

    /// Fetch a job by id.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::JobNotFound`] if no such job exists.
    async fn get(&self, id: JobId) -> Result<Job, PipelineError>;

    /// Overwrite a job's mutable fields (status, current stage, token
    /// usage, timestamps).
    async fn update(&self, job: &Job) -> Result<(), PipelineError>;

    /// List jobs, optionally filtered by status.
    async fn list(&self, status: Option<JobStatus>) -> Result<Vec<Job>, PipelineError>;

    /// Delete a job record. Does not touch its checkpoints; callers that
    /// want both should also call `CheckpointStore::delete_all`.
    async fn delete(&self, id: JobId) -> Result<(), PipelineError>;

    /// Append one entry to a job's error history.
    async fn append_error(&self, id: JobId, error: &ErrorRecord) -> Result<(), PipelineError>;

    /// Fetch a job's full error history, oldest first.
    async fn error_history(&self, id: JobId) -> Result<Vec<ErrorRecord>, PipelineError>;

    /// Attempt to acquire an exclusive processing lease on a job for
    /// `worker_id`, valid for `ttl`. Resolves the "two workers retry the
    /// same job" hazard: a worker must hold the lease to run any stage.
    ///
    /// Returns `true` if the lease was acquired (no other worker currently
    /// holds a non-expired lease), `false` otherwise.
    async fn acquire_lease(&self, id: JobId, worker_id: &str, ttl: Duration) -> Result<bool, PipelineError>;

    /// Release a held lease early, e.g. on graceful worker shutdown.
    async fn release_lease(&self, id: JobId, worker_id: &str) -> Result<(), PipelineError>;

    /// Durably record that `stage`'s checkpoint now exists for `id`. Used
    /// so that a job's completed-stage set survives a crash independently
    /// of the in-memory `Job` passed through one run of the engine.
    async fn mark_stage_complete(&self, id: JobId, stage: StageOrder) -> Result<(), PipelineError>;
}
