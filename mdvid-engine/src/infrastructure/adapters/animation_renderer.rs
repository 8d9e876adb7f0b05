// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Animation Renderer Port
//!
//! Used by stage 7, the only subprocess-backed collaborator: the enhanced
//! script is handed to an external renderer binary via
//! `tokio::process::Command`, and the adapter maps its exit status to
//! [`mdvid_domain::error::PipelineError`].

use async_trait::async_trait;
use mdvid_domain::error::PipelineError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderQuality {
    High,
    Draft,
}

impl RenderQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderQuality::High => "high",
            RenderQuality::Draft => "draft",
        }
    }

    /// Parse a configured quality name, case-insensitively. Anything other
    /// than `"high"` is treated as `Draft` — the lowest quality is always a
    /// safe fallback default.
    pub fn parse(name: &str) -> RenderQuality {
        match name.to_ascii_lowercase().as_str() {
            "high" => RenderQuality::High,
            _ => RenderQuality::Draft,
        }
    }
}

#[async_trait]
pub trait AnimationRenderer: Send + Sync {
    /// Render `script_path` into a silent video at `quality`, returning the
    /// output file path.
    async fn render(&self, script_path: &Path, quality: RenderQuality) -> Result<PathBuf, PipelineError>;
}

/// Subprocess-backed production implementation, invoking an external
/// renderer binary configured by name (e.g. `manim`, a house renderer).
pub struct SubprocessRenderer {
    binary: String,
    output_dir: PathBuf,
}

impl SubprocessRenderer {
    pub fn new(binary: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        SubprocessRenderer {
            binary: binary.into(),
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl AnimationRenderer for SubprocessRenderer {
    async fn render(&self, script_path: &Path, quality: RenderQuality) -> Result<PathBuf, PipelineError> {
        let output_path = self.output_dir.join(format!(
            "{}.mp4",
            script_path.file_stem().and_then(|s| s.to_str()).unwrap_or("render")
        ));

        let status = Command::new(&self.binary)
            .arg("--script")
            .arg(script_path)
            .arg("--quality")
            .arg(quality.as_str())
            .arg("--out")
            .arg(&output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .status()
            .await
            .map_err(|e| PipelineError::render(format!("failed to spawn {}: {e}", self.binary)))?;

        if !status.success() {
            return Err(PipelineError::render(format!(
                "{} exited with {status}",
                self.binary
            )));
        }

        Ok(output_path)
    }
}
