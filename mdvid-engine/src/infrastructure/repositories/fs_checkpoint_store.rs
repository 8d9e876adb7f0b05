// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Filesystem Checkpoint Store
//!
//! One JSON file per `(job, stage)`, written atomically: serialize to a
//! `.tmp` sibling in the same directory, then `rename` over the final path.
//! A crash mid-write leaves the previous checkpoint (or nothing) intact,
//! never a half-written file.

use async_trait::async_trait;
use mdvid_domain::entities::{CheckpointData, JobContext};
use mdvid_domain::error::PipelineError;
use mdvid_domain::value_objects::{JobId, StageOrder};
use std::path::{Path, PathBuf};
use tokio::fs;

pub struct FsCheckpointStore {
    root: PathBuf,
}

impl FsCheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsCheckpointStore { root: root.into() }
    }

    fn job_dir(&self, job_id: JobId) -> PathBuf {
        self.root.join(job_id.to_string())
    }

    fn stage_path(&self, job_id: JobId, stage: StageOrder) -> PathBuf {
        self.job_dir(job_id).join(format!("stage_{:02}.json", stage.value()))
    }

    async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::filesystem(parent.display().to_string(), e.to_string()))?;
        }
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)
            .await
            .map_err(|e| PipelineError::filesystem(tmp_path.display().to_string(), e.to_string()))?;
        fs::rename(&tmp_path, path)
            .await
            .map_err(|e| PipelineError::filesystem(path.display().to_string(), e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl mdvid_domain::repositories::CheckpointStore for FsCheckpointStore {
    async fn save(&self, job_id: JobId, stage: StageOrder, context: &JobContext) -> Result<(), PipelineError> {
        let data = CheckpointData {
            job_id,
            stage_index: stage.value(),
            stage_name: String::new(),
            context: context.clone(),
        };
        let json = serde_json::to_vec_pretty(&data)?;
        Self::write_atomic(&self.stage_path(job_id, stage), &json).await
    }

    async fn load(&self, job_id: JobId, stage: StageOrder) -> Result<CheckpointData, PipelineError> {
        let path = self.stage_path(job_id, stage);
        let bytes = fs::read(&path).await.map_err(|_| PipelineError::CheckpointNotFound {
            job_id: job_id.to_string(),
            stage_index: stage.value(),
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn load_latest(&self, job_id: JobId) -> Result<Option<CheckpointData>, PipelineError> {
        let dir = self.job_dir(job_id);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PipelineError::filesystem(dir.display().to_string(), e.to_string())),
        };

        let mut latest_stage: Option<u32> = None;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| PipelineError::filesystem(dir.display().to_string(), e.to_string()))?
        {
            if let Some(stage) = parse_stage_filename(&entry.file_name().to_string_lossy()) {
                latest_stage = Some(latest_stage.map_or(stage, |current| current.max(stage)));
            }
        }

        match latest_stage {
            Some(stage_value) => {
                let stage = StageOrder::new(stage_value)?;
                Ok(Some(self.load(job_id, stage).await?))
            }
            None => Ok(None),
        }
    }

    async fn delete_all(&self, job_id: JobId) -> Result<(), PipelineError> {
        let dir = self.job_dir(job_id);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PipelineError::filesystem(dir.display().to_string(), e.to_string())),
        }
    }
}

fn parse_stage_filename(name: &str) -> Option<u32> {
    name.strip_prefix("stage_")?.strip_suffix(".json")?.parse().ok()
}
