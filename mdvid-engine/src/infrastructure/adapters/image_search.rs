// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Image Search Port
//!
//! Used by stage 5 to resolve each planned image query into candidate
//! source URLs before they're handed to the `HttpFetcher`.

use async_trait::async_trait;
use mdvid_domain::error::PipelineError;

/// A candidate image location returned by an image search provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUrl(pub String);

#[async_trait]
pub trait ImageSearchService: Send + Sync {
    /// Search for images matching `query`, best match first. An empty
    /// result is not an error — the caller decides whether a missing image
    /// degrades or fails the job.
    async fn search(&self, query: &str) -> Result<Vec<ImageUrl>, PipelineError>;
}
