// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error Taxonomy
//!
//! `PipelineError` is the single error type that crosses every domain
//! boundary. It carries an [`ErrorKind`] classification so the Stage Runner
//! can decide, without inspecting message text, whether a failure is worth
//! retrying, whether it should trigger a stage's fallback policy, or whether
//! it is fatal to the whole job.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a stage failure, independent of which stage
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Upstream LLM/image/speech provider reports a rate or quota limit.
    Quota,
    /// Input failed to parse or validate against an expected grammar.
    Syntax,
    /// Transport-level failure talking to a remote collaborator.
    Network,
    /// Local filesystem or workspace I/O failure.
    Filesystem,
    /// A remote API responded but with an error status or malformed body.
    RemoteApi,
    /// The animation renderer subprocess failed or produced no output.
    Render,
    /// Output did not match the format a downstream stage requires.
    Format,
    /// A stage attempt exceeded its wall-clock budget.
    Timeout,
    /// Cancellation was observed at a suspension point.
    Cancelled,
    /// Could not be classified into any of the above.
    Unknown,
}

impl ErrorKind {
    /// Whether a failure of this kind is worth retrying at all. `Cancelled`
    /// is the only kind the Stage Runner never retries.
    pub fn is_recoverable(self) -> bool {
        !matches!(self, ErrorKind::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Quota => "quota",
            ErrorKind::Syntax => "syntax",
            ErrorKind::Network => "network",
            ErrorKind::Filesystem => "filesystem",
            ErrorKind::RemoteApi => "remote-api",
            ErrorKind::Render => "render",
            ErrorKind::Format => "format",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The domain-wide error type.
///
/// `Clone` so a failure can be recorded in an [`crate::entities::error_record::ErrorRecord`]
/// without being consumed by the `?` operator at the call site.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("quota exceeded calling {collaborator}: {detail}")]
    Quota { collaborator: String, detail: String },

    #[error("syntax error in {context}: {detail}")]
    Syntax { context: String, detail: String },

    #[error("network error calling {collaborator}: {detail}")]
    Network { collaborator: String, detail: String },

    #[error("filesystem error at {path}: {detail}")]
    Filesystem { path: String, detail: String },

    #[error("remote API error from {collaborator} (status {status:?}): {detail}")]
    RemoteApi {
        collaborator: String,
        status: Option<u16>,
        detail: String,
    },

    #[error("render failure: {detail}")]
    Render { detail: String },

    #[error("format mismatch: expected {expected}, got {actual}")]
    Format { expected: String, actual: String },

    #[error("operation timed out after {elapsed_secs}s")]
    Timeout { elapsed_secs: u64 },

    #[error("operation cancelled")]
    Cancelled,

    #[error("job not found: {job_id}")]
    JobNotFound { job_id: String },

    #[error("checkpoint not found for job {job_id} stage {stage_index}")]
    CheckpointNotFound { job_id: String, stage_index: u32 },

    #[error("invalid stage order: {0}")]
    InvalidStageOrder(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl PipelineError {
    /// Classify this error into its [`ErrorKind`] for the Stage Runner.
    pub fn category(&self) -> ErrorKind {
        match self {
            PipelineError::Quota { .. } => ErrorKind::Quota,
            PipelineError::Syntax { .. } => ErrorKind::Syntax,
            PipelineError::Network { .. } => ErrorKind::Network,
            PipelineError::Filesystem { .. } => ErrorKind::Filesystem,
            PipelineError::RemoteApi { .. } => ErrorKind::RemoteApi,
            PipelineError::Render { .. } => ErrorKind::Render,
            PipelineError::Format { .. } => ErrorKind::Format,
            PipelineError::Timeout { .. } => ErrorKind::Timeout,
            PipelineError::Cancelled => ErrorKind::Cancelled,
            PipelineError::JobNotFound { .. }
            | PipelineError::CheckpointNotFound { .. }
            | PipelineError::InvalidStageOrder(_)
            | PipelineError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Whether the Stage Runner should attempt a retry for this error.
    pub fn is_recoverable(&self) -> bool {
        self.category().is_recoverable()
    }

    pub fn quota(collaborator: impl Into<String>, detail: impl Into<String>) -> Self {
        PipelineError::Quota {
            collaborator: collaborator.into(),
            detail: detail.into(),
        }
    }

    pub fn network(collaborator: impl Into<String>, detail: impl Into<String>) -> Self {
        PipelineError::Network {
            collaborator: collaborator.into(),
            detail: detail.into(),
        }
    }

    pub fn filesystem(path: impl Into<String>, detail: impl Into<String>) -> Self {
        PipelineError::Filesystem {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn render(detail: impl Into<String>) -> Self {
        PipelineError::Render { detail: detail.into() }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::Filesystem {
            path: "<unknown>".to_string(),
            detail: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Format {
            expected: "valid JSON".to_string(),
            actual: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_is_not_recoverable() {
        assert!(!PipelineError::Cancelled.is_recoverable());
    }

    #[test]
    fn quota_is_recoverable() {
        let e = PipelineError::quota("llm", "rate limited");
        assert!(e.is_recoverable());
        assert_eq!(e.category(), ErrorKind::Quota);
    }

    #[test]
    fn io_error_converts_to_filesystem() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PipelineError = io_err.into();
        assert_eq!(err.category(), ErrorKind::Filesystem);
    }
}
