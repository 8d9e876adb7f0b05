// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Structure
//!
//! `clap`-derived argument structure for the `mdvid` binary. Parsing here is
//! purely syntactic; security and range validation happens in `validator`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mdvid", version, about = "Markdown-to-video pipeline engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a TOML configuration file (overrides defaults, overridden by
    /// MDVID_ environment variables)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of worker tasks processing jobs concurrently
    #[arg(long, global = true)]
    pub workers: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new job from a Markdown source file
    Create {
        /// Path to the Markdown source document
        input: PathBuf,
        /// Style prompt bundle name to load
        #[arg(long, default_value = "default")]
        style: String,
    },
    /// Run a pending or degraded job to completion (or until it blocks)
    Run {
        /// Job identifier
        job_id: String,
    },
    /// Resume a job from its last durable checkpoint
    Resume {
        /// Job identifier
        job_id: String,
    },
    /// Report the current status of a job
    Status {
        /// Job identifier
        job_id: String,
    },
    /// List known jobs
    List {
        /// Only show jobs in this status
        #[arg(long)]
        status: Option<String>,
    },
    /// Request cooperative cancellation of a running job
    Cancel {
        /// Job identifier
        job_id: String,
    },
    /// Delete a job record and its checkpoints
    Delete {
        /// Job identifier
        job_id: String,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

/// Parse CLI arguments with clap. Handles `--help`/`--version` and exits the
/// process on parse failure, per clap's default behavior.
pub fn parse_cli() -> Cli {
    Cli::parse()
}
