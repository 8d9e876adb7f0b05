// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! One method per CLI subcommand. `Application` owns the shared singletons
//! (stores, pipeline engine) and the registry of cancellation tokens for
//! jobs currently running in this process.

use mdvid_domain::entities::{ErrorRecord, Job, JobContext, JobStatus};
use mdvid_domain::error::PipelineError;
use mdvid_domain::repositories::{CheckpointStore, JobStore};
use mdvid_domain::value_objects::JobId;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::infrastructure::runtime::PipelineEngine;

/// How long a worker holds a job's processing lease before it must renew
/// it. Chosen generously relative to a single stage's wall-clock budget so
/// a live worker never loses its own lease mid-stage.
const LEASE_TTL: Duration = Duration::from_secs(1800);

/// Summary of a job plus its recorded error history, returned by the
/// `status` use case.
#[derive(Debug, Clone)]
pub struct JobStatusReport {
    pub job: Job,
    pub errors: Vec<ErrorRecord>,
}

/// Coordinates the CLI subcommands against the domain ports and the
/// pipeline engine. Cheaply cloneable: every field is an `Arc`.
#[derive(Clone)]
pub struct Application {
    job_store: Arc<dyn JobStore>,
    checkpoint_store: Arc<dyn CheckpointStore>,
    engine: Arc<PipelineEngine>,
    worker_id: String,
    active_jobs: Arc<Mutex<HashMap<JobId, CancellationToken>>>,
}

impl Application {
    pub fn new(
        job_store: Arc<dyn JobStore>,
        checkpoint_store: Arc<dyn CheckpointStore>,
        engine: Arc<PipelineEngine>,
        worker_id: impl Into<String>,
    ) -> Self {
        Application {
            job_store,
            checkpoint_store,
            engine,
            worker_id: worker_id.into(),
            active_jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a new job record for `input_path` rendered in `style_name`.
    /// Does not run it; callers typically follow with `run_job`.
    pub async fn create_job(&self, input_path: &str, style_name: &str) -> Result<Job, PipelineError> {
        let job = Job::new(input_path, style_name);
        self.job_store.create(&job).await?;
        info!(job_id = %job.id, "created job");
        Ok(job)
    }

    /// Run a job from its current stage, acquiring an exclusive lease for
    /// the duration of the run so a second worker can't retry it
    /// concurrently. Registers a cancellation token so `cancel_job` can
    /// reach it while it's in flight.
    pub async fn run_job(&self, job_id: &str) -> Result<JobContext, PipelineError> {
        let id = parse_job_id(job_id)?;
        let job = self.job_store.get(id).await?;
        self.run_leased(job, JobContext::new()).await
    }

    /// Resume a job from its most recent checkpoint, or from scratch if it
    /// never checkpointed. Otherwise identical to `run_job`.
    pub async fn resume_job(&self, job_id: &str) -> Result<JobContext, PipelineError> {
        let id = parse_job_id(job_id)?;
        let job = self.job_store.get(id).await?;
        let context = match self.checkpoint_store.load_latest(id).await? {
            Some(checkpoint) => checkpoint.context,
            None => JobContext::new(),
        };
        self.run_leased(job, context).await
    }

    async fn run_leased(&self, job: Job, context: JobContext) -> Result<JobContext, PipelineError> {
        let id = job.id;
        let acquired = self.job_store.acquire_lease(id, &self.worker_id, LEASE_TTL).await?;
        if !acquired {
            return Err(PipelineError::Unknown(format!(
                "job {id} is already leased by another worker"
            )));
        }

        let cancel = CancellationToken::new();
        self.active_jobs.lock().expect("active_jobs mutex poisoned").insert(id, cancel.clone());

        let result = self.engine.run(job, context, cancel).await;

        self.active_jobs.lock().expect("active_jobs mutex poisoned").remove(&id);
        let _ = self.job_store.release_lease(id, &self.worker_id).await;
        result
    }

    /// Signal cancellation to a job running in this process. Returns
    /// `false` if the job isn't currently tracked as active here (it may be
    /// running in a different worker process, or already finished).
    pub fn cancel_job(&self, job_id: &str) -> Result<bool, PipelineError> {
        let id = parse_job_id(job_id)?;
        let guard = self.active_jobs.lock().expect("active_jobs mutex poisoned");
        match guard.get(&id) {
            Some(token) => {
                token.cancel();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Fetch a job's current record plus its full error history.
    pub async fn status_job(&self, job_id: &str) -> Result<JobStatusReport, PipelineError> {
        let id = parse_job_id(job_id)?;
        let job = self.job_store.get(id).await?;
        let errors = self.job_store.error_history(id).await?;
        Ok(JobStatusReport { job, errors })
    }

    /// List jobs, optionally filtered by status name (`pending`,
    /// `processing`, `done`, `error`, `degraded`).
    pub async fn list_jobs(&self, status: Option<&str>) -> Result<Vec<Job>, PipelineError> {
        let status = status.map(parse_job_status).transpose()?;
        self.job_store.list(status).await
    }

    /// Cancel every job this process currently has registered as active,
    /// e.g. on receipt of SIGTERM/SIGINT during graceful shutdown.
    pub fn cancel_all(&self) {
        let guard = self.active_jobs.lock().expect("active_jobs mutex poisoned");
        for token in guard.values() {
            token.cancel();
        }
    }

    /// Delete a job and all of its checkpoints. `force` is accepted for
    /// parity with the CLI surface; deletion is unconditional either way
    /// once a job id resolves, since there is no "in use" lock to check
    /// beyond the processing lease itself.
    pub async fn delete_job(&self, job_id: &str, _force: bool) -> Result<(), PipelineError> {
        let id = parse_job_id(job_id)?;
        self.checkpoint_store.delete_all(id).await?;
        self.job_store.delete(id).await
    }
}

fn parse_job_id(raw: &str) -> Result<JobId, PipelineError> {
    JobId::from_str(raw)
}

fn parse_job_status(raw: &str) -> Result<JobStatus, PipelineError> {
    match raw.to_ascii_lowercase().as_str() {
        "pending" => Ok(JobStatus::Pending),
        "processing" => Ok(JobStatus::Processing),
        "done" => Ok(JobStatus::Done),
        "error" => Ok(JobStatus::Error),
        "degraded" => Ok(JobStatus::Degraded),
        other => Err(PipelineError::Format {
            expected: "one of pending|processing|done|error|degraded".to_string(),
            actual: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_status_names() {
        assert_eq!(parse_job_status("done").unwrap(), JobStatus::Done);
        assert_eq!(parse_job_status("DEGRADED").unwrap(), JobStatus::Degraded);
    }

    #[test]
    fn rejects_unknown_status_name() {
        assert!(parse_job_status("bogus").is_err());
    }

    #[test]
    fn rejects_malformed_job_id() {
        assert!(parse_job_id("not-a-ulid").is_err());
    }
}
