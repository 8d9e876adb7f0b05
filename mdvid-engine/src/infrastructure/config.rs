// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Engine Configuration
//!
//! Layered configuration via the `config` crate: defaults, an optional TOML
//! file, then `MDVID_`-prefixed environment variable overrides, validated
//! once at construction.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum retry attempts per stage before it is considered exhausted.
    #[serde(default = "default_max_retries_per_stage")]
    pub max_retries_per_stage: u32,

    /// Hard ceiling on total retries across a job's whole run, independent
    /// of per-stage limits.
    #[serde(default = "default_total_retry_ceiling")]
    pub total_retry_ceiling: u32,

    /// Base backoff delay in seconds: `min(cap, base * 2^(attempt-2))`.
    #[serde(default = "default_backoff_base_seconds")]
    pub backoff_base_seconds: u64,

    /// Backoff cap in seconds.
    #[serde(default = "default_backoff_cap_seconds")]
    pub backoff_cap_seconds: u64,

    /// Root directory for per-job working files (downloaded images,
    /// rendered video, audio clips).
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Root directory for checkpoint snapshots.
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,

    /// SQLite connection URI for the job store.
    #[serde(default = "default_job_store_uri")]
    pub job_store_uri: String,

    /// Default narration voice identifier.
    #[serde(default = "default_voice_id")]
    pub default_voice_id: String,

    /// Primary render quality preset.
    #[serde(default = "default_render_quality_primary")]
    pub render_quality_primary: String,

    /// Fallback render quality preset, used if the primary fails once and
    /// the render stage's degradable policy allows a retry at lower
    /// quality.
    #[serde(default = "default_render_quality_fallback")]
    pub render_quality_fallback: String,

    /// Markdown input is truncated past this many characters before being
    /// handed to any LLM stage.
    #[serde(default = "default_markdown_input_truncation_chars")]
    pub markdown_input_truncation_chars: usize,

    /// Number of worker tasks processing jobs concurrently.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Bounded internal parallelism for image fetch / audio synthesis.
    #[serde(default = "default_internal_concurrency")]
    pub internal_concurrency: usize,
}

fn default_max_retries_per_stage() -> u32 {
    3
}
fn default_total_retry_ceiling() -> u32 {
    20
}
fn default_backoff_base_seconds() -> u64 {
    2
}
fn default_backoff_cap_seconds() -> u64 {
    30
}
fn default_workspace_root() -> PathBuf {
    PathBuf::from("./mdvid-workspace")
}
fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("./mdvid-workspace/checkpoints")
}
fn default_job_store_uri() -> String {
    "sqlite://mdvid-workspace/jobs.db".to_string()
}
fn default_voice_id() -> String {
    "narrator-default".to_string()
}
fn default_render_quality_primary() -> String {
    "high".to_string()
}
fn default_render_quality_fallback() -> String {
    "draft".to_string()
}
fn default_markdown_input_truncation_chars() -> usize {
    50_000
}
fn default_worker_count() -> usize {
    4
}
fn default_internal_concurrency() -> usize {
    6
}

impl EngineConfig {
    /// Load configuration layering defaults, an optional TOML file at
    /// `config_path`, then `MDVID_`-prefixed environment variables.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(false));
        }

        builder = builder.add_source(Environment::with_prefix("MDVID").separator("__"));

        let config = builder.build()?;
        let engine_config: EngineConfig = config.try_deserialize().unwrap_or_else(|_| EngineConfig::defaults());
        engine_config.validate()?;
        Ok(engine_config)
    }

    /// Configuration with every field at its documented default.
    pub fn defaults() -> Self {
        EngineConfig {
            max_retries_per_stage: default_max_retries_per_stage(),
            total_retry_ceiling: default_total_retry_ceiling(),
            backoff_base_seconds: default_backoff_base_seconds(),
            backoff_cap_seconds: default_backoff_cap_seconds(),
            workspace_root: default_workspace_root(),
            checkpoint_dir: default_checkpoint_dir(),
            job_store_uri: default_job_store_uri(),
            default_voice_id: default_voice_id(),
            render_quality_primary: default_render_quality_primary(),
            render_quality_fallback: default_render_quality_fallback(),
            markdown_input_truncation_chars: default_markdown_input_truncation_chars(),
            worker_count: default_worker_count(),
            internal_concurrency: default_internal_concurrency(),
        }
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_seconds)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_secs(self.backoff_cap_seconds)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries_per_stage == 0 {
            return Err(ConfigError::Message("max_retries_per_stage must be at least 1".to_string()));
        }
        if self.backoff_cap_seconds < self.backoff_base_seconds {
            return Err(ConfigError::Message(
                "backoff_cap_seconds must be >= backoff_base_seconds".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(ConfigError::Message("worker_count must be at least 1".to_string()));
        }
        if self.internal_concurrency == 0 {
            return Err(ConfigError::Message("internal_concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let config = EngineConfig::defaults();
        assert!(config.validate().is_ok());
        assert_eq!(config.backoff_base(), Duration::from_secs(2));
        assert_eq!(config.backoff_cap(), Duration::from_secs(30));
    }

    #[test]
    fn rejects_zero_max_retries() {
        let mut config = EngineConfig::defaults();
        config.max_retries_per_stage = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_cap_below_base() {
        let mut config = EngineConfig::defaults();
        config.backoff_base_seconds = 60;
        config.backoff_cap_seconds = 5;
        assert!(config.validate().is_err());
    }
}
