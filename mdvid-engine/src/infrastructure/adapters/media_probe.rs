// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Media Probe Port (added)
//!
//! Not part of the original six collaborators, but needed to populate
//! `JobContext::video_duration`/`audio_duration` before the pre-merge gate
//! runs, and to decide how much silence to pad a short audio track with.

use async_trait::async_trait;
use mdvid_domain::error::PipelineError;
use std::path::Path;
use std::time::Duration;

#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn duration(&self, path: &Path) -> Result<Duration, PipelineError>;
}
