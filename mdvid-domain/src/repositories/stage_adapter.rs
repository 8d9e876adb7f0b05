// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Adapter Port
//!
//! Every pipeline stage is an implementation of `StageAdapter`. The Stage
//! Runner (infrastructure layer) is the only caller; it owns retry, backoff,
//! rollback and fallback policy so individual adapters stay free of that
//! concern and only implement the stage's actual work.

use crate::entities::{Job, JobContext};
use crate::error::PipelineError;
use crate::value_objects::StageOrder;
use async_trait::async_trait;

/// Minimal, runtime-agnostic cancellation check. The domain layer cannot
/// depend on `tokio`, so this trait is the seam the engine's
/// `tokio_util::sync::CancellationToken`-backed type implements.
pub trait CancellationSignal: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

/// A no-op signal for tests and one-shot CLI invocations that never cancel.
pub struct NeverCancelled;

impl CancellationSignal for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// One stage's business logic: stages 0 through 10 from "load style
/// prompts" through "mux audio & video".
#[async_trait]
pub trait StageAdapter: Send + Sync {
    /// This adapter's position in the fixed pipeline sequence.
    fn order(&self) -> StageOrder;

    /// A short, log-friendly name for this stage.
    fn name(&self) -> &'static str;

    /// Execute the stage, producing an updated context. Implementations
    /// should check `cancel.is_cancelled()` before any expensive or
    /// blocking sub-step and return [`PipelineError::Cancelled`] if set.
    async fn execute(
        &self,
        job: &Job,
        context: JobContext,
        cancel: &dyn CancellationSignal,
    ) -> Result<JobContext, PipelineError>;

    /// Degraded-path behavior for stages whose descriptor declares a
    /// fallback. Called by the Stage Runner only after the retry ceiling is
    /// exhausted on a stage whose [`crate::value_objects::Criticality`] is
    /// `Degradable`. The default rejects fallback; adapters that support one
    /// must override it.
    async fn fallback(&self, _job: &Job, _context: JobContext) -> Result<JobContext, PipelineError> {
        Err(PipelineError::Unknown("stage has no fallback".to_string()))
    }
}
