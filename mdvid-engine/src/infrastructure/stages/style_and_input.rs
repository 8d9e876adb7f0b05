// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Stages 0 and 1: no external collaborator, just local filesystem and
//! input-shape validation.

use async_trait::async_trait;
use mdvid_domain::entities::{Job, JobContext};
use mdvid_domain::error::PipelineError;
use mdvid_domain::repositories::{CancellationSignal, StageAdapter};
use mdvid_domain::value_objects::StageOrder;
use std::path::PathBuf;
use tokio::fs;

/// Embedded style prompt used when a job's named style file is missing or
/// unreadable, so a broken style configuration degrades a job rather than
/// failing it outright.
const DEFAULT_STYLE_PROMPTS: &str = "Use a plain, neutral narration style with simple, uncluttered visuals.";

/// Stage 0: load the named style's prompt bundle from the workspace's
/// `styles/<style_name>.md` file, verbatim. Falls back to an embedded
/// default style when the file can't be read.
pub struct LoadStylePromptsStage {
    workspace_root: PathBuf,
}

impl LoadStylePromptsStage {
    pub fn new(workspace_root: PathBuf) -> Self {
        LoadStylePromptsStage { workspace_root }
    }
}

#[async_trait]
impl StageAdapter for LoadStylePromptsStage {
    fn order(&self) -> StageOrder {
        StageOrder::first()
    }

    fn name(&self) -> &'static str {
        "load_style_prompts"
    }

    async fn execute(
        &self,
        job: &Job,
        mut context: JobContext,
        cancel: &dyn CancellationSignal,
    ) -> Result<JobContext, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let style_path = self
            .workspace_root
            .join("styles")
            .join(format!("{}.md", job.style_name));

        let prompts = fs::read_to_string(&style_path)
            .await
            .map_err(|e| PipelineError::filesystem(style_path.display().to_string(), e.to_string()))?;

        context.style_prompts = Some(prompts);
        Ok(context)
    }

    async fn fallback(&self, _job: &Job, mut context: JobContext) -> Result<JobContext, PipelineError> {
        context.style_prompts = Some(DEFAULT_STYLE_PROMPTS.to_string());
        Ok(context)
    }
}

/// Stage 1: validate the job's input Markdown exists and is non-empty,
/// normalize line endings, and truncate past the configured character
/// ceiling before any LLM stage sees it.
pub struct ValidateNormalizeInputStage {
    truncation_chars: usize,
}

impl ValidateNormalizeInputStage {
    pub fn new(truncation_chars: usize) -> Self {
        ValidateNormalizeInputStage { truncation_chars }
    }
}

#[async_trait]
impl StageAdapter for ValidateNormalizeInputStage {
    fn order(&self) -> StageOrder {
        StageOrder::new(1).expect("stage 1 is always valid")
    }

    fn name(&self) -> &'static str {
        "validate_normalize_input"
    }

    async fn execute(
        &self,
        job: &Job,
        mut context: JobContext,
        cancel: &dyn CancellationSignal,
    ) -> Result<JobContext, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let raw = fs::read_to_string(&job.input_path)
            .await
            .map_err(|e| PipelineError::filesystem(job.input_path.clone(), e.to_string()))?;

        if raw.trim().is_empty() {
            return Err(PipelineError::Syntax {
                context: job.input_path.clone(),
                detail: "input markdown is empty".to_string(),
            });
        }

        let normalized = raw.replace("\r\n", "\n");
        let truncated = if normalized.chars().count() > self.truncation_chars {
            normalized.chars().take(self.truncation_chars).collect()
        } else {
            normalized
        };

        context.normalized_markdown = Some(truncated);
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdvid_domain::repositories::NeverCancelled;

    #[tokio::test]
    async fn style_fallback_uses_embedded_default() {
        let dir = tempfile::tempdir().unwrap();
        let stage = LoadStylePromptsStage::new(dir.path().to_path_buf());
        let job = Job::new("doc.md", "missing-style");
        let result = stage.fallback(&job, JobContext::new()).await.unwrap();
        assert_eq!(result.style_prompts.as_deref(), Some(DEFAULT_STYLE_PROMPTS));
    }

    #[tokio::test]
    async fn rejects_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("doc.md");
        fs::write(&input_path, "   \n\t").await.unwrap();

        let job = Job::new(input_path.to_string_lossy().to_string(), "default");
        let stage = ValidateNormalizeInputStage::new(50_000);
        let result = stage.execute(&job, JobContext::new(), &NeverCancelled).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn truncates_past_the_configured_ceiling() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("doc.md");
        fs::write(&input_path, "a".repeat(100)).await.unwrap();

        let job = Job::new(input_path.to_string_lossy().to_string(), "default");
        let stage = ValidateNormalizeInputStage::new(10);
        let context = stage.execute(&job, JobContext::new(), &NeverCancelled).await.unwrap();
        assert_eq!(context.normalized_markdown.unwrap().len(), 10);
    }
}
