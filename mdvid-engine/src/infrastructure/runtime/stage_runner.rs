// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Runner
//!
//! Owns retry, backoff, rollback, fallback and timeout policy for a single
//! stage attempt so that [`mdvid_domain::repositories::StageAdapter`]
//! implementations stay free of it. The Pipeline Engine calls
//! [`StageRunner::run`] once per stage per job.

use mdvid_domain::entities::{ErrorRecord, Job, JobContext};
use mdvid_domain::error::PipelineError;
use mdvid_domain::repositories::{CancellationSignal, CheckpointStore, StageAdapter};
use mdvid_domain::value_objects::{Criticality, StageDescriptor};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Implements the domain's runtime-agnostic [`CancellationSignal`] over a
/// `tokio_util` cancellation token, so the engine can drive cancellation
/// through `tokio::select!` elsewhere while stage adapters see only the
/// narrow domain trait.
pub struct TokioCancellation(CancellationToken);

impl TokioCancellation {
    pub fn new(token: CancellationToken) -> Self {
        TokioCancellation(token)
    }
}

impl CancellationSignal for TokioCancellation {
    fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// The result of running one stage to completion, degraded completion, or
/// fatal failure.
pub enum StageOutcome {
    Completed(JobContext),
    /// The stage's primary path exhausted its retries but its fallback
    /// then succeeded. Distinguished from `Completed` because a successful
    /// fallback still spends one unit of the job's degraded-stage budget.
    CompletedViaFallback(JobContext),
    Degraded(JobContext),
    Failed(PipelineError),
}

pub struct StageRunner {
    checkpoint_store: Arc<dyn CheckpointStore>,
    backoff_base: Duration,
    backoff_cap: Duration,
    total_retry_ceiling: u32,
}

impl StageRunner {
    pub fn new(
        checkpoint_store: Arc<dyn CheckpointStore>,
        backoff_base: Duration,
        backoff_cap: Duration,
        total_retry_ceiling: u32,
    ) -> Self {
        StageRunner {
            checkpoint_store,
            backoff_base,
            backoff_cap,
            total_retry_ceiling,
        }
    }

    /// `min(cap, base * 2^(attempt-2))`, attempt is 1-indexed; the first
    /// retry (attempt 2) waits exactly `base`.
    fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exponent = attempt.saturating_sub(2);
        let scaled = self.backoff_base.saturating_mul(1u32.checked_shl(exponent).unwrap_or(u32::MAX));
        scaled.min(self.backoff_cap)
    }

    /// Run `adapter` against `job`/`context`, retrying per `descriptor`'s
    /// policy. Returns the final outcome plus every `ErrorRecord` produced
    /// along the way (for the caller to persist via `JobStore::append_error`).
    pub async fn run(
        &self,
        adapter: &dyn StageAdapter,
        descriptor: &StageDescriptor,
        job: &mut Job,
        mut context: JobContext,
        cancel: &CancellationToken,
    ) -> (StageOutcome, Vec<ErrorRecord>) {
        let mut records = Vec::new();
        let mut attempt: u32 = 1;
        let signal = TokioCancellation::new(cancel.clone());

        loop {
            if cancel.is_cancelled() {
                return (StageOutcome::Failed(PipelineError::Cancelled), records);
            }

            let attempt_result = tokio::time::timeout(
                descriptor.max_wall_clock,
                adapter.execute(job, context.clone(), &signal),
            )
            .await;

            let error = match attempt_result {
                Ok(Ok(updated_context)) => {
                    if let Err(e) = self
                        .checkpoint_store
                        .save(job.id, descriptor.order, &updated_context)
                        .await
                    {
                        warn!(stage = descriptor.name, error = %e, "checkpoint save failed after successful stage");
                    }
                    return (StageOutcome::Completed(updated_context), records);
                }
                Ok(Err(e)) => e,
                Err(_elapsed) => PipelineError::Timeout {
                    elapsed_secs: descriptor.max_wall_clock.as_secs(),
                },
            };

            let kind = error.category();
            records.push(ErrorRecord::new(descriptor.order, kind, error.to_string(), attempt));

            if !error.is_recoverable() {
                return (StageOutcome::Failed(error), records);
            }

            if job.total_retry_count >= self.total_retry_ceiling {
                warn!(
                    stage = descriptor.name,
                    total_retry_count = job.total_retry_count,
                    ceiling = self.total_retry_ceiling,
                    "job-wide retry ceiling exceeded; forcing fatal termination"
                );
                return (StageOutcome::Failed(error), records);
            }

            if attempt >= descriptor.max_retries {
                if descriptor.has_fallback {
                    match adapter.fallback(job, context.clone()).await {
                        Ok(fallback_context) => {
                            if let Some(last) = records.pop() {
                                records.push(last.with_fallback());
                            }
                            if let Err(e) = self
                                .checkpoint_store
                                .save(job.id, descriptor.order, &fallback_context)
                                .await
                            {
                                warn!(stage = descriptor.name, error = %e, "checkpoint save failed after fallback");
                            }
                            return (StageOutcome::CompletedViaFallback(fallback_context), records);
                        }
                        Err(fallback_error) => {
                            records.push(ErrorRecord::new(
                                descriptor.order,
                                fallback_error.category(),
                                fallback_error.to_string(),
                                attempt,
                            ));
                        }
                    }
                }

                return match descriptor.criticality {
                    Criticality::Fatal => (StageOutcome::Failed(error), records),
                    Criticality::Degradable => (StageOutcome::Degraded(context), records),
                };
            }

            // Roll back to the last good checkpoint before retrying, so a
            // retried stage never starts from a partially-mutated context.
            if let Ok(Some(checkpoint)) = self.checkpoint_store.load_latest(job.id).await {
                context = checkpoint.context;
                if let Some(last) = records.pop() {
                    records.push(last.with_checkpoint_restore());
                }
            }

            job.record_retry();
            let delay = self.backoff_for_attempt(attempt + 1);
            info!(stage = descriptor.name, attempt, delay_secs = delay.as_secs(), "retrying stage");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_follows_doubling_schedule_with_cap() {
        let runner = StageRunner::new(
            Arc::new(NoopCheckpointStore),
            Duration::from_secs(2),
            Duration::from_secs(30),
            100,
        );
        assert_eq!(runner.backoff_for_attempt(1), Duration::ZERO);
        assert_eq!(runner.backoff_for_attempt(2), Duration::from_secs(2));
        assert_eq!(runner.backoff_for_attempt(3), Duration::from_secs(4));
        assert_eq!(runner.backoff_for_attempt(4), Duration::from_secs(8));
        assert_eq!(runner.backoff_for_attempt(8), Duration::from_secs(30));
    }

    proptest::proptest! {
        #[test]
        fn backoff_never_exceeds_cap(base_secs in 1u64..10, cap_secs in 1u64..60, attempt in 1u32..40) {
            let runner = StageRunner::new(
                Arc::new(NoopCheckpointStore),
                Duration::from_secs(base_secs),
                Duration::from_secs(cap_secs),
                100,
            );
            proptest::prop_assert!(runner.backoff_for_attempt(attempt) <= Duration::from_secs(cap_secs));
        }

        #[test]
        fn backoff_is_non_decreasing_in_attempt(base_secs in 1u64..10, cap_secs in 1u64..120, attempt in 1u32..39) {
            let runner = StageRunner::new(
                Arc::new(NoopCheckpointStore),
                Duration::from_secs(base_secs),
                Duration::from_secs(cap_secs),
                100,
            );
            let this = runner.backoff_for_attempt(attempt);
            let next = runner.backoff_for_attempt(attempt + 1);
            proptest::prop_assert!(next >= this);
        }
    }

    struct NoopCheckpointStore;

    #[async_trait::async_trait]
    impl CheckpointStore for NoopCheckpointStore {
        async fn save(
            &self,
            _job_id: mdvid_domain::value_objects::JobId,
            _stage: mdvid_domain::value_objects::StageOrder,
            _context: &JobContext,
        ) -> Result<(), PipelineError> {
            Ok(())
        }

        async fn load(
            &self,
            job_id: mdvid_domain::value_objects::JobId,
            stage: mdvid_domain::value_objects::StageOrder,
        ) -> Result<mdvid_domain::entities::CheckpointData, PipelineError> {
            Err(PipelineError::CheckpointNotFound {
                job_id: job_id.to_string(),
                stage_index: stage.value(),
            })
        }

        async fn load_latest(
            &self,
            _job_id: mdvid_domain::value_objects::JobId,
        ) -> Result<Option<mdvid_domain::entities::CheckpointData>, PipelineError> {
            Ok(None)
        }

        async fn delete_all(&self, _job_id: mdvid_domain::value_objects::JobId) -> Result<(), PipelineError> {
            Ok(())
        }
    }
}
