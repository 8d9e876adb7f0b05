// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Observability
//!
//! Structured logging via `tracing`, configured from the `RUST_LOG`
//! environment variable (falling back to a sane default) with a
//! human-readable formatter for local runs.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber. Safe to call once per process;
/// a second call is a no-op (the underlying `try_init` just returns `Err`,
/// which we discard).
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .try_init();
}
