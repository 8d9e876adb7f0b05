// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Speech Synthesizer Port
//!
//! Used by stage 9 to turn narration text into an audio clip per scene.

use async_trait::async_trait;
use mdvid_domain::error::PipelineError;
use std::path::PathBuf;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<PathBuf, PipelineError>;
}
