// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Stages 2, 3, 6, and 8: the four stages whose work is "ask the LLM,
//! record tokens, write one context field."

use crate::infrastructure::adapters::LlmService;
use async_trait::async_trait;
use mdvid_domain::entities::{Job, JobContext};
use mdvid_domain::error::PipelineError;
use mdvid_domain::repositories::{CancellationSignal, StageAdapter};
use mdvid_domain::value_objects::StageOrder;
use std::sync::Arc;

/// Stage 2: synthesize a short document summary from the normalized
/// Markdown. Has a fallback: reuse the first paragraph verbatim.
pub struct SynthesizeSummaryStage {
    llm: Arc<dyn LlmService>,
}

impl SynthesizeSummaryStage {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        SynthesizeSummaryStage { llm }
    }
}

#[async_trait]
impl StageAdapter for SynthesizeSummaryStage {
    fn order(&self) -> StageOrder {
        StageOrder::new(2).expect("stage 2 is always valid")
    }

    fn name(&self) -> &'static str {
        "synthesize_summary"
    }

    async fn execute(
        &self,
        _job: &Job,
        mut context: JobContext,
        cancel: &dyn CancellationSignal,
    ) -> Result<JobContext, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let markdown = context
            .normalized_markdown
            .as_deref()
            .ok_or_else(|| PipelineError::Unknown("summary stage ran before input validation".to_string()))?;

        let prompt = format!("Summarize this document in three sentences:\n\n{markdown}");
        let (summary, usage) = self.llm.complete(&prompt).await?;
        context.summary = Some(summary);
        context.pending_token_usage.add(usage);
        Ok(context)
    }

    async fn fallback(&self, _job: &Job, mut context: JobContext) -> Result<JobContext, PipelineError> {
        let markdown = context.normalized_markdown.clone().unwrap_or_default();
        let first_paragraph = markdown.split("\n\n").next().unwrap_or_default().to_string();
        context.summary = Some(first_paragraph);
        Ok(context)
    }
}

/// Stage 3: synthesize the base animation script from the summary. Has a
/// fallback: a single-scene script that just narrates the summary.
pub struct SynthesizeBaseScriptStage {
    llm: Arc<dyn LlmService>,
}

impl SynthesizeBaseScriptStage {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        SynthesizeBaseScriptStage { llm }
    }
}

#[async_trait]
impl StageAdapter for SynthesizeBaseScriptStage {
    fn order(&self) -> StageOrder {
        StageOrder::new(3).expect("stage 3 is always valid")
    }

    fn name(&self) -> &'static str {
        "synthesize_base_script"
    }

    async fn execute(
        &self,
        _job: &Job,
        mut context: JobContext,
        cancel: &dyn CancellationSignal,
    ) -> Result<JobContext, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let summary = context
            .summary
            .as_deref()
            .ok_or_else(|| PipelineError::Unknown("script stage ran before summary".to_string()))?;
        let style = context.style_prompts.as_deref().unwrap_or_default();

        let prompt = format!("Using this style guide:\n{style}\n\nWrite an animation script for:\n{summary}");
        let (script, usage) = self.llm.complete(&prompt).await?;
        context.base_script = Some(script);
        context.pending_token_usage.add(usage);
        Ok(context)
    }

    async fn fallback(&self, _job: &Job, mut context: JobContext) -> Result<JobContext, PipelineError> {
        let summary = context.summary.clone().unwrap_or_default();
        context.base_script = Some(format!("[Scene 1]\nNarrator: {summary}"));
        Ok(context)
    }
}

/// Stage 6: enhance the base script with references to the fetched images.
/// Degradable with a fallback: pass the base script through unenhanced.
pub struct EnhanceScriptWithImagesStage {
    llm: Arc<dyn LlmService>,
}

impl EnhanceScriptWithImagesStage {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        EnhanceScriptWithImagesStage { llm }
    }
}

#[async_trait]
impl StageAdapter for EnhanceScriptWithImagesStage {
    fn order(&self) -> StageOrder {
        StageOrder::new(6).expect("stage 6 is always valid")
    }

    fn name(&self) -> &'static str {
        "enhance_script_with_images"
    }

    async fn execute(
        &self,
        _job: &Job,
        mut context: JobContext,
        cancel: &dyn CancellationSignal,
    ) -> Result<JobContext, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let base_script = context
            .base_script
            .as_deref()
            .ok_or_else(|| PipelineError::Unknown("enhance stage ran before base script".to_string()))?;

        if context.fetched_images.is_empty() {
            context.enhanced_script = Some(base_script.to_string());
            return Ok(context);
        }

        let image_list = context
            .fetched_images
            .iter()
            .map(|img| format!("scene {}: {}", img.scene_index, img.local_path))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!("Insert these images into the script at their scenes:\n{image_list}\n\n{base_script}");
        let (enhanced, usage) = self.llm.complete(&prompt).await?;
        context.enhanced_script = Some(enhanced);
        context.pending_token_usage.add(usage);
        Ok(context)
    }

    async fn fallback(&self, _job: &Job, mut context: JobContext) -> Result<JobContext, PipelineError> {
        context.enhanced_script = context.base_script.clone();
        Ok(context)
    }
}

/// Stage 8: synthesize narration text, one line per scene, from the
/// enhanced script. Has a fallback: reuse the enhanced script verbatim as
/// narration.
pub struct SynthesizeNarrationTextStage {
    llm: Arc<dyn LlmService>,
}

impl SynthesizeNarrationTextStage {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        SynthesizeNarrationTextStage { llm }
    }
}

#[async_trait]
impl StageAdapter for SynthesizeNarrationTextStage {
    fn order(&self) -> StageOrder {
        StageOrder::new(8).expect("stage 8 is always valid")
    }

    fn name(&self) -> &'static str {
        "synthesize_narration_text"
    }

    async fn execute(
        &self,
        _job: &Job,
        mut context: JobContext,
        cancel: &dyn CancellationSignal,
    ) -> Result<JobContext, PipelineError> {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let enhanced = context
            .enhanced_script
            .as_deref()
            .ok_or_else(|| PipelineError::Unknown("narration stage ran before script enhancement".to_string()))?;

        let prompt = format!("Write narration lines, one per scene, for this script:\n{enhanced}");
        let (narration, usage) = self.llm.complete(&prompt).await?;
        context.narration_text = Some(narration);
        context.pending_token_usage.add(usage);
        Ok(context)
    }

    async fn fallback(&self, _job: &Job, mut context: JobContext) -> Result<JobContext, PipelineError> {
        context.narration_text = context.enhanced_script.clone();
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::local::LocalLlmService;
    use mdvid_domain::repositories::NeverCancelled;

    #[tokio::test]
    async fn summary_stage_requires_normalized_markdown() {
        let stage = SynthesizeSummaryStage::new(Arc::new(LocalLlmService));
        let job = Job::new("doc.md", "default");
        let result = stage.execute(&job, JobContext::new(), &NeverCancelled).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn summary_fallback_uses_first_paragraph() {
        let stage = SynthesizeSummaryStage::new(Arc::new(LocalLlmService));
        let job = Job::new("doc.md", "default");
        let mut context = JobContext::new();
        context.normalized_markdown = Some("First paragraph.\n\nSecond paragraph.".to_string());
        let result = stage.fallback(&job, context).await.unwrap();
        assert_eq!(result.summary.as_deref(), Some("First paragraph."));
    }

    #[tokio::test]
    async fn enhance_stage_passes_through_without_images() {
        let stage = EnhanceScriptWithImagesStage::new(Arc::new(LocalLlmService));
        let job = Job::new("doc.md", "default");
        let mut context = JobContext::new();
        context.base_script = Some("[Scene 1] hello".to_string());
        let result = stage.execute(&job, context, &NeverCancelled).await.unwrap();
        assert_eq!(result.enhanced_script.as_deref(), Some("[Scene 1] hello"));
    }
}
