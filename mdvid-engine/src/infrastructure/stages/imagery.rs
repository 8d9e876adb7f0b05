// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Stages 4 and 5: planning which images a scene needs, then fetching them
//! with bounded internal parallelism.

use crate::infrastructure::adapters::{HttpFetcher, ImageSearchService, LlmService};
use async_trait::async_trait;
use mdvid_domain::entities::{FetchedImage, ImagePlanEntry, Job, JobContext};
use mdvid_domain::error::PipelineError;
use mdvid_domain::repositories::{CancellationSignal, StageAdapter};
use mdvid_domain::value_objects::StageOrder;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Semaphore;

/// Stage 4: ask the LLM which images each scene needs and where they
/// belong in the layout. Degradable with a fallback: an empty plan, which
/// simply skips imagery for the video.
pub struct PlanImagesLayoutsStage {
    llm: Arc<dyn LlmService>,
}

impl PlanImagesLayoutsStage {
    pub fn new(llm: Arc<dyn LlmService>) -> Self {
        PlanImagesLayoutsStage { llm }
    }
}

#[async_trait]
impl StageAdapter for PlanImagesLayoutsStage {
    fn order(&self) -> StageOrder {
        StageOrder::new(4).expect("stage 4 is always valid")
    }

    fn name(&self) -> &'static str {
        "plan_images_layouts"
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
        let script = context
            .base_script
            .as_deref()
            .ok_or_else(|| PipelineError::Unknown("image plan stage ran before base script".to_string()))?;

        let prompt = format!("List one image search query per scene for this script:\n{script}");
        let (plan_text, usage) = self.llm.complete(&prompt).await?;
        context.pending_token_usage.add(usage);

        context.image_plan = plan_text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| ImagePlanEntry {
                scene_index: i as u32,
                search_query: line.trim().to_string(),
                layout_hint: "center".to_string(),
            })
            .collect();

        Ok(context)
    }

    async fn fallback(&self, _job: &Job, mut context: JobContext) -> Result<JobContext, PipelineError> {
        context.image_plan.clear();
        Ok(context)
    }
}

/// Stage 5: fetch every planned image, bounded by a semaphore so a large
/// plan doesn't open unbounded concurrent connections. Degradable: a scene
/// whose image fails to fetch is simply dropped from `fetched_images`.
pub struct FetchImagesStage {
    image_search: Arc<dyn ImageSearchService>,
    http_fetcher: Arc<dyn HttpFetcher>,
    workspace_root: PathBuf,
}

impl FetchImagesStage {
    pub fn new(
        image_search: Arc<dyn ImageSearchService>,
        http_fetcher: Arc<dyn HttpFetcher>,
        workspace_root: PathBuf,
    ) -> Self {
        FetchImagesStage {
            image_search,
            http_fetcher,
            workspace_root,
        }
    }
}

#[async_trait]
impl StageAdapter for FetchImagesStage {
    fn order(&self) -> StageOrder {
        StageOrder::new(5).expect("stage 5 is always valid")
    }

    fn name(&self) -> &'static str {
        "fetch_images"
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

        if context.image_plan.is_empty() {
            return Ok(context);
        }

        let images_dir = self.workspace_root.join(job.id.to_string()).join("images");
        fs::create_dir_all(&images_dir).await?;

        let semaphore = Arc::new(Semaphore::new(6));
        let mut tasks = Vec::new();

        for entry in context.image_plan.clone() {
            let image_search = self.image_search.clone();
            let http_fetcher = self.http_fetcher.clone();
            let semaphore = semaphore.clone();
            let images_dir = images_dir.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                let candidates = image_search.search(&entry.search_query).await?;
                let Some(candidate) = candidates.into_iter().next() else {
                    return Ok::<Option<FetchedImage>, PipelineError>(None);
                };
                let bytes = http_fetcher.fetch(&candidate.0).await?;
                let local_path = images_dir.join(format!("scene-{}.img", entry.scene_index));
                fs::write(&local_path, bytes).await?;
                Ok(Some(FetchedImage {
                    scene_index: entry.scene_index,
                    source_url: candidate.0,
                    local_path: local_path.display().to_string(),
                }))
            }));
        }

        let mut fetched = Vec::new();
        for task in tasks {
            match task.await {
                Ok(Ok(Some(image))) => fetched.push(image),
                Ok(Ok(None)) => {}
                Ok(Err(_)) | Err(_) => {}
            }
        }

        context.fetched_images = fetched;
        Ok(context)
    }

    async fn fallback(&self, _job: &Job, mut context: JobContext) -> Result<JobContext, PipelineError> {
        context.fetched_images.clear();
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::local::{LocalHttpFetcher, LocalImageSearchService, LocalLlmService};
    use mdvid_domain::repositories::NeverCancelled;

    #[tokio::test]
    async fn empty_plan_fetches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let stage = FetchImagesStage::new(
            Arc::new(LocalImageSearchService),
            Arc::new(LocalHttpFetcher),
            dir.path().to_path_buf(),
        );
        let job = Job::new("doc.md", "default");
        let result = stage.execute(&job, JobContext::new(), &NeverCancelled).await.unwrap();
        assert!(result.fetched_images.is_empty());
    }

    #[tokio::test]
    async fn fetches_one_image_per_plan_entry() {
        let dir = tempfile::tempdir().unwrap();
        let stage = FetchImagesStage::new(
            Arc::new(LocalImageSearchService),
            Arc::new(LocalHttpFetcher),
            dir.path().to_path_buf(),
        );
        let job = Job::new("doc.md", "default");
        let mut context = JobContext::new();
        context.image_plan = vec![
            ImagePlanEntry {
                scene_index: 0,
                search_query: "a cat".to_string(),
                layout_hint: "center".to_string(),
            },
            ImagePlanEntry {
                scene_index: 1,
                search_query: "a dog".to_string(),
                layout_hint: "left".to_string(),
            },
        ];
        let result = stage.execute(&job, context, &NeverCancelled).await.unwrap();
        assert_eq!(result.fetched_images.len(), 2);
    }

    #[tokio::test]
    async fn plan_stage_derives_one_entry_per_line() {
        let stage = PlanImagesLayoutsStage::new(Arc::new(LocalLlmService));
        let job = Job::new("doc.md", "default");
        let mut context = JobContext::new();
        context.base_script = Some("script".to_string());
        let result = stage.execute(&job, context, &NeverCancelled).await.unwrap();
        assert!(!result.image_plan.is_empty());
    }
}
