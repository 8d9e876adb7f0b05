// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! External collaborator ports and their implementations. Each trait here
//! is the seam a stage adapter calls through; the production implementation
//! talks to a real remote service, and `local` holds a deterministic
//! stand-in used by integration tests and as the engine's offline default.

pub mod animation_renderer;
pub mod av_muxer;
pub mod http_fetcher;
pub mod image_search;
pub mod llm;
pub mod local;
pub mod media_probe;
pub mod speech_synthesizer;

pub use animation_renderer::{AnimationRenderer, RenderQuality};
pub use av_muxer::AvMuxer;
pub use http_fetcher::HttpFetcher;
pub use image_search::{ImageSearchService, ImageUrl};
pub use llm::LlmService;
pub use media_probe::MediaProbe;
pub use speech_synthesizer::SpeechSynthesizer;
