// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Audio/Video Muxer Port
//!
//! Used by stage 10, the final step: combine the silent video with the
//! synthesized narration audio into the job's output artifact.

use async_trait::async_trait;
use mdvid_domain::error::PipelineError;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait AvMuxer: Send + Sync {
    async fn mux(&self, video_path: &Path, audio_path: &Path) -> Result<PathBuf, PipelineError>;
}
