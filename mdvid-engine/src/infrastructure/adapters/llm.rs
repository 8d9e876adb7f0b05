// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # LLM Service Port
//!
//! Used by stages 2 (summary), 3 (base script), 6 (enhance with images), and
//! 8 (narration text). All four stages funnel through a single `complete`
//! call so retry/backoff/quota handling lives in exactly one place in the
//! Stage Runner rather than once per stage.

use async_trait::async_trait;
use mdvid_domain::error::PipelineError;
use mdvid_domain::value_objects::TokenUsage;

#[async_trait]
pub trait LlmService: Send + Sync {
    /// Complete `prompt`, returning the generated text and the tokens it
    /// cost. Implementations classify provider quota/rate-limit responses
    /// as `PipelineError::Quota` so the Stage Runner can apply the quota
    /// backoff policy.
    async fn complete(&self, prompt: &str) -> Result<(String, TokenUsage), PipelineError>;
}
