// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Local/Deterministic Adapters
//!
//! Stand-ins for every external collaborator that never touch the network
//! or spawn a subprocess. These exercise the full orchestration logic —
//! retries, checkpoints, the pre-merge gate — without depending on live
//! credentials, the same role the teacher's pass-through/debug stage
//! services play for its compression and encryption stages.

use super::animation_renderer::{AnimationRenderer, RenderQuality};
use super::av_muxer::AvMuxer;
use super::http_fetcher::HttpFetcher;
use super::image_search::{ImageSearchService, ImageUrl};
use super::llm::LlmService;
use super::media_probe::MediaProbe;
use super::speech_synthesizer::SpeechSynthesizer;
use async_trait::async_trait;
use mdvid_domain::error::PipelineError;
use mdvid_domain::value_objects::TokenUsage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::fs;

/// Echoes back a deterministic response derived from the prompt's length,
/// so repeated calls with the same prompt produce the same token counts.
pub struct LocalLlmService;

#[async_trait]
impl LlmService for LocalLlmService {
    async fn complete(&self, prompt: &str) -> Result<(String, TokenUsage), PipelineError> {
        let input_tokens = (prompt.len() as u64 / 4).max(1);
        let output_tokens = input_tokens / 2;
        let text = format!("[local-completion of {} chars]", prompt.len());
        Ok((text, TokenUsage::new(input_tokens, output_tokens)))
    }
}

/// Always returns one synthetic candidate URL per query.
pub struct LocalImageSearchService;

#[async_trait]
impl ImageSearchService for LocalImageSearchService {
    async fn search(&self, query: &str) -> Result<Vec<ImageUrl>, PipelineError> {
        Ok(vec![ImageUrl(format!("local://images/{}", slugify(query)))])
    }
}

/// Returns a small fixed PNG-shaped byte buffer for any `local://` URL.
pub struct LocalHttpFetcher;

#[async_trait]
impl HttpFetcher for LocalHttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PipelineError> {
        if !url.starts_with("local://") {
            return Err(PipelineError::network("local-http", format!("unsupported url: {url}")));
        }
        Ok(vec![0x89, 0x50, 0x4e, 0x47]) // PNG magic bytes, a minimal deterministic stand-in
    }
}

/// Writes an empty placeholder file instead of invoking a renderer binary.
pub struct LocalAnimationRenderer {
    output_dir: PathBuf,
}

impl LocalAnimationRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        LocalAnimationRenderer {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl AnimationRenderer for LocalAnimationRenderer {
    async fn render(&self, script_path: &Path, quality: RenderQuality) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.output_dir).await?;
        let output_path = self.output_dir.join(format!(
            "{}-{}.mp4",
            script_path.file_stem().and_then(|s| s.to_str()).unwrap_or("render"),
            quality.as_str()
        ));
        fs::write(&output_path, b"local-silent-video-placeholder").await?;
        Ok(output_path)
    }
}

/// Writes a placeholder audio clip sized proportionally to the narration
/// text so duration-alignment logic has something realistic to check.
pub struct LocalSpeechSynthesizer {
    output_dir: PathBuf,
    counter: AtomicUsize,
}

impl LocalSpeechSynthesizer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        LocalSpeechSynthesizer {
            output_dir: output_dir.into(),
            counter: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for LocalSpeechSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.output_dir).await?;
        let index = self.counter.fetch_add(1, Ordering::SeqCst);
        let output_path = self.output_dir.join(format!("clip-{index}-{voice_id}.wav"));
        fs::write(&output_path, text.as_bytes()).await?;
        Ok(output_path)
    }
}

/// Concatenates the two placeholder files; not a real container format, but
/// deterministic and sufficient to exercise the mux stage end to end.
pub struct LocalAvMuxer {
    output_dir: PathBuf,
}

impl LocalAvMuxer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        LocalAvMuxer {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl AvMuxer for LocalAvMuxer {
    async fn mux(&self, video_path: &Path, audio_path: &Path) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.output_dir).await?;
        let output_path = self.output_dir.join("final.mp4");
        let mut combined = fs::read(video_path).await?;
        combined.extend(fs::read(audio_path).await?);
        fs::write(&output_path, combined).await?;
        Ok(output_path)
    }
}

/// Estimates duration from file size: one deterministic second per 64
/// bytes, with a one-second floor so empty placeholder files still probe
/// to something nonzero.
pub struct LocalMediaProbe;

#[async_trait]
impl MediaProbe for LocalMediaProbe {
    async fn duration(&self, path: &Path) -> Result<Duration, PipelineError> {
        let metadata = fs::metadata(path).await?;
        let secs = (metadata.len() / 64).max(1);
        Ok(Duration::from_secs(secs))
    }
}

fn slugify(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn llm_completion_is_deterministic_for_same_prompt() {
        let llm = LocalLlmService;
        let (text_a, usage_a) = llm.complete("hello world").await.unwrap();
        let (text_b, usage_b) = llm.complete("hello world").await.unwrap();
        assert_eq!(text_a, text_b);
        assert_eq!(usage_a, usage_b);
    }

    #[tokio::test]
    async fn image_search_returns_one_candidate() {
        let search = LocalImageSearchService;
        let results = search.search("a cat").await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn http_fetcher_rejects_non_local_urls() {
        let fetcher = LocalHttpFetcher;
        assert!(fetcher.fetch("https://example.com/x.png").await.is_err());
    }
}
