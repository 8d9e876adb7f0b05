// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Job Store
//!
//! Production `JobStore` implementation backed by `sqlx`'s SQLite driver.
//! Every write goes through a transaction so a job's row and its error
//! history entries never observe each other's partial state.

use super::schema::SCHEMA_SQL;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mdvid_domain::entities::{ErrorRecord, Job, JobStatus};
use mdvid_domain::error::{ErrorKind, PipelineError};
use mdvid_domain::value_objects::{JobId, StageOrder, TokenUsage};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;

pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    /// Connect to `uri` (e.g. `sqlite://mdvid-workspace/jobs.db`), creating
    /// the database file and schema if they don't already exist.
    pub async fn connect(uri: &str) -> Result<Self, PipelineError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(uri)
            .await
            .map_err(|e| PipelineError::filesystem(uri, e.to_string()))?;

        sqlx::query(SCHEMA_SQL)
            .execute(&pool)
            .await
            .map_err(|e| PipelineError::filesystem(uri, format!("schema init failed: {e}")))?;

        Ok(SqliteJobStore { pool })
    }

    fn map_sqlx_err(err: sqlx::Error) -> PipelineError {
        PipelineError::filesystem("sqlite", err.to_string())
    }
}

fn status_to_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::Processing => "processing",
        JobStatus::Done => "done",
        JobStatus::Error => "error",
        JobStatus::Degraded => "degraded",
    }
}

fn status_from_str(s: &str) -> Result<JobStatus, PipelineError> {
    match s {
        "pending" => Ok(JobStatus::Pending),
        "processing" => Ok(JobStatus::Processing),
        "done" => Ok(JobStatus::Done),
        "error" => Ok(JobStatus::Error),
        "degraded" => Ok(JobStatus::Degraded),
        other => Err(PipelineError::Format {
            expected: "a known job status".to_string(),
            actual: other.to_string(),
        }),
    }
}

fn kind_to_str(kind: ErrorKind) -> &'static str {
    kind.as_str()
}

fn kind_from_str(s: &str) -> ErrorKind {
    match s {
        "quota" => ErrorKind::Quota,
        "syntax" => ErrorKind::Syntax,
        "network" => ErrorKind::Network,
        "filesystem" => ErrorKind::Filesystem,
        "remote-api" => ErrorKind::RemoteApi,
        "render" => ErrorKind::Render,
        "format" => ErrorKind::Format,
        "timeout" => ErrorKind::Timeout,
        "cancelled" => ErrorKind::Cancelled,
        _ => ErrorKind::Unknown,
    }
}

/// Encode a completed-stage set as a comma-separated list, e.g. `"0,1,2"`.
fn encode_completed_stages(stages: &[u32]) -> String {
    stages.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
}

/// Inverse of [`encode_completed_stages`]. An empty string decodes to an
/// empty set.
fn decode_completed_stages(encoded: &str) -> Vec<u32> {
    if encoded.is_empty() {
        return Vec::new();
    }
    encoded.split(',').filter_map(|s| s.parse().ok()).collect()
}

#[async_trait]
impl mdvid_domain::repositories::JobStore for SqliteJobStore {
    async fn create(&self, job: &Job) -> Result<(), PipelineError> {
        sqlx::query(
            "INSERT INTO jobs (id, status, current_stage, input_path, style_name, input_tokens, \
             output_tokens, degraded_stage_count, total_retry_count, completed_stages, final_video_path, \
             created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(job.id.to_string())
        .bind(status_to_str(job.status))
        .bind(job.current_stage.value() as i64)
        .bind(&job.input_path)
        .bind(&job.style_name)
        .bind(job.token_usage.input as i64)
        .bind(job.token_usage.output as i64)
        .bind(job.degraded_stage_count as i64)
        .bind(job.total_retry_count as i64)
        .bind(encode_completed_stages(&job.completed_stages))
        .bind(&job.final_video_path)
        .bind(job.created_at.to_rfc3339())
        .bind(job.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)?;
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Job, PipelineError> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?
            .ok_or_else(|| PipelineError::JobNotFound { job_id: id.to_string() })?;

        row_to_job(&row)
    }

    async fn update(&self, job: &Job) -> Result<(), PipelineError> {
        let result = sqlx::query(
            "UPDATE jobs SET status = ?1, current_stage = ?2, input_tokens = ?3, output_tokens = ?4, \
             degraded_stage_count = ?5, total_retry_count = ?6, completed_stages = ?7, \
             final_video_path = ?8, updated_at = ?9 WHERE id = ?10",
        )
        .bind(status_to_str(job.status))
        .bind(job.current_stage.value() as i64)
        .bind(job.token_usage.input as i64)
        .bind(job.token_usage.output as i64)
        .bind(job.degraded_stage_count as i64)
        .bind(job.total_retry_count as i64)
        .bind(encode_completed_stages(&job.completed_stages))
        .bind(&job.final_video_path)
        .bind(job.updated_at.to_rfc3339())
        .bind(job.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(PipelineError::JobNotFound {
                job_id: job.id.to_string(),
            });
        }
        Ok(())
    }

    async fn list(&self, status: Option<JobStatus>) -> Result<Vec<Job>, PipelineError> {
        let rows = match status {
            Some(status) => {
                sqlx::query("SELECT * FROM jobs WHERE status = ?1 ORDER BY created_at ASC")
                    .bind(status_to_str(status))
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                sqlx::query("SELECT * FROM jobs ORDER BY created_at ASC")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(Self::map_sqlx_err)?;

        rows.iter().map(row_to_job).collect()
    }

    async fn delete(&self, id: JobId) -> Result<(), PipelineError> {
        sqlx::query("DELETE FROM job_error_history WHERE job_id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?;
        sqlx::query("DELETE FROM job_leases WHERE job_id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?;
        sqlx::query("DELETE FROM jobs WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?;
        Ok(())
    }

    async fn append_error(&self, id: JobId, error: &ErrorRecord) -> Result<(), PipelineError> {
        sqlx::query(
            "INSERT INTO job_error_history (job_id, stage, kind, detail, retry_attempt, used_fallback, \
             restored_from_checkpoint, at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(id.to_string())
        .bind(error.stage.value() as i64)
        .bind(kind_to_str(error.kind))
        .bind(&error.detail)
        .bind(error.retry_attempt as i64)
        .bind(error.used_fallback)
        .bind(error.restored_from_checkpoint)
        .bind(error.at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)?;
        Ok(())
    }

    async fn error_history(&self, id: JobId) -> Result<Vec<ErrorRecord>, PipelineError> {
        let rows = sqlx::query("SELECT * FROM job_error_history WHERE job_id = ?1 ORDER BY id ASC")
            .bind(id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?;

        rows.iter()
            .map(|row| {
                let stage_value: i64 = row.try_get("stage").map_err(Self::map_sqlx_err)?;
                let stage = StageOrder::new(stage_value as u32)?;
                let at_str: String = row.try_get("at").map_err(Self::map_sqlx_err)?;
                let at = DateTime::parse_from_rfc3339(&at_str)
                    .map_err(|e| PipelineError::Format {
                        expected: "RFC3339 timestamp".to_string(),
                        actual: e.to_string(),
                    })?
                    .with_timezone(&Utc);
                let kind_str: String = row.try_get("kind").map_err(Self::map_sqlx_err)?;
                let detail: String = row.try_get("detail").map_err(Self::map_sqlx_err)?;
                let retry_attempt: i64 = row.try_get("retry_attempt").map_err(Self::map_sqlx_err)?;
                let used_fallback: bool = row.try_get("used_fallback").map_err(Self::map_sqlx_err)?;
                let restored: bool = row
                    .try_get("restored_from_checkpoint")
                    .map_err(Self::map_sqlx_err)?;

                let mut record = ErrorRecord::new(stage, kind_from_str(&kind_str), detail, retry_attempt as u32);
                record.at = at;
                if used_fallback {
                    record = record.with_fallback();
                }
                if restored {
                    record = record.with_checkpoint_restore();
                }
                Ok(record)
            })
            .collect()
    }

    async fn acquire_lease(&self, id: JobId, worker_id: &str, ttl: Duration) -> Result<bool, PipelineError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(60));

        sqlx::query("DELETE FROM job_leases WHERE job_id = ?1 AND expires_at < ?2")
            .bind(id.to_string())
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?;

        let result = sqlx::query(
            "INSERT OR IGNORE INTO job_leases (job_id, worker_id, expires_at) VALUES (?1, ?2, ?3)",
        )
        .bind(id.to_string())
        .bind(worker_id)
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(Self::map_sqlx_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_lease(&self, id: JobId, worker_id: &str) -> Result<(), PipelineError> {
        sqlx::query("DELETE FROM job_leases WHERE job_id = ?1 AND worker_id = ?2")
            .bind(id.to_string())
            .bind(worker_id)
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?;
        Ok(())
    }

    async fn mark_stage_complete(&self, id: JobId, stage: StageOrder) -> Result<(), PipelineError> {
        let row = sqlx::query("SELECT completed_stages FROM jobs WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?
            .ok_or_else(|| PipelineError::JobNotFound { job_id: id.to_string() })?;

        let encoded: String = row.try_get("completed_stages").map_err(Self::map_sqlx_err)?;
        let mut stages = decode_completed_stages(&encoded);
        if !stages.contains(&stage.value()) {
            stages.push(stage.value());
        }

        sqlx::query("UPDATE jobs SET completed_stages = ?1 WHERE id = ?2")
            .bind(encode_completed_stages(&stages))
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Self::map_sqlx_err)?;
        Ok(())
    }
}

fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> Result<Job, PipelineError> {
    let id_str: String = row.try_get("id").map_err(SqliteJobStore::map_sqlx_err)?;
    let id = JobId::from_str(&id_str)?;

    let status_str: String = row.try_get("status").map_err(SqliteJobStore::map_sqlx_err)?;
    let status = status_from_str(&status_str)?;

    let current_stage: i64 = row.try_get("current_stage").map_err(SqliteJobStore::map_sqlx_err)?;
    let current_stage = StageOrder::new(current_stage as u32)?;

    let input_path: String = row.try_get("input_path").map_err(SqliteJobStore::map_sqlx_err)?;
    let style_name: String = row.try_get("style_name").map_err(SqliteJobStore::map_sqlx_err)?;
    let input_tokens: i64 = row.try_get("input_tokens").map_err(SqliteJobStore::map_sqlx_err)?;
    let output_tokens: i64 = row.try_get("output_tokens").map_err(SqliteJobStore::map_sqlx_err)?;
    let degraded_stage_count: i64 = row
        .try_get("degraded_stage_count")
        .map_err(SqliteJobStore::map_sqlx_err)?;
    let total_retry_count: i64 = row
        .try_get("total_retry_count")
        .map_err(SqliteJobStore::map_sqlx_err)?;
    let completed_stages_str: String = row
        .try_get("completed_stages")
        .map_err(SqliteJobStore::map_sqlx_err)?;
    let final_video_path: Option<String> = row
        .try_get("final_video_path")
        .map_err(SqliteJobStore::map_sqlx_err)?;

    let created_at_str: String = row.try_get("created_at").map_err(SqliteJobStore::map_sqlx_err)?;
    let updated_at_str: String = row.try_get("updated_at").map_err(SqliteJobStore::map_sqlx_err)?;
    let parse_ts = |s: &str| -> Result<DateTime<Utc>, PipelineError> {
        Ok(DateTime::parse_from_rfc3339(s)
            .map_err(|e| PipelineError::Format {
                expected: "RFC3339 timestamp".to_string(),
                actual: e.to_string(),
            })?
            .with_timezone(&Utc))
    };

    Ok(Job {
        id,
        status,
        current_stage,
        input_path,
        style_name,
        token_usage: TokenUsage::new(input_tokens as u64, output_tokens as u64),
        degraded_stage_count: degraded_stage_count as u32,
        total_retry_count: total_retry_count as u32,
        completed_stages: decode_completed_stages(&completed_stages_str),
        final_video_path,
        created_at: parse_ts(&created_at_str)?,
        updated_at: parse_ts(&updated_at_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdvid_domain::repositories::JobStore;

    #[tokio::test]
    async fn mark_stage_complete_persists_and_is_idempotent() {
        let store = SqliteJobStore::connect("sqlite::memory:").await.unwrap();
        let job = Job::new("doc.md", "default");
        store.create(&job).await.unwrap();

        let stage = StageOrder::new(3).unwrap();
        store.mark_stage_complete(job.id, stage).await.unwrap();
        store.mark_stage_complete(job.id, stage).await.unwrap();

        let reloaded = store.get(job.id).await.unwrap();
        assert_eq!(reloaded.completed_stages, vec![3]);
    }

    #[tokio::test]
    async fn update_persists_final_video_path_and_retry_count() {
        let store = SqliteJobStore::connect("sqlite::memory:").await.unwrap();
        let mut job = Job::new("doc.md", "default");
        store.create(&job).await.unwrap();

        job.record_retry();
        job.record_retry();
        job.set_final_video_path("/out/final.mp4");
        store.update(&job).await.unwrap();

        let reloaded = store.get(job.id).await.unwrap();
        assert_eq!(reloaded.total_retry_count, 2);
        assert_eq!(reloaded.final_video_path.as_deref(), Some("/out/final.mp4"));
    }
}
