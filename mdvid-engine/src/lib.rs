// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Markdown-to-Video Pipeline Engine
//!
//! Infrastructure and application layer for the resilient markdown-to-video
//! conversion pipeline: the Stage Runner, the Pipeline Engine, the eleven
//! stage adapters, a SQLite-backed `JobStore`, a filesystem-backed
//! `CheckpointStore`, configuration loading, logging setup, and the
//! application-layer use cases the bootstrap CLI dispatches into.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Bootstrap (mdvid-bootstrap)                │
//! │   CLI parsing, signal handling, exit codes, shutdown         │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Application Layer                       │
//! │      (create / run / resume / cancel / status use cases)     │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Domain Layer                          │
//! │   (mdvid-domain: Job, JobContext, StageRegistry, gate)       │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  (StageRunner, PipelineEngine, SQLite, filesystem, adapters)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod application;
pub mod infrastructure;

pub use mdvid_domain::{ErrorKind, Job, JobContext, JobStatus, PipelineError};

pub use infrastructure::config::EngineConfig;
pub use infrastructure::runtime::pipeline_engine::PipelineEngine;
