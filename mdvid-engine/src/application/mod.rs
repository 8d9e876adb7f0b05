// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Application layer: one use case per CLI subcommand, each a thin
//! coordination of the domain's `JobStore`/`CheckpointStore` ports and the
//! infrastructure's `PipelineEngine`. No business logic lives here — it
//! belongs in the domain or in the stage adapters.

pub mod use_cases;

pub use use_cases::Application;
