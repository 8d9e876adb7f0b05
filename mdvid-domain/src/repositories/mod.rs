// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Repository and adapter ports: the traits infrastructure implements and
//! the domain and engine depend on.

pub mod checkpoint_store;
pub mod job_store;
pub mod stage_adapter;

pub use checkpoint_store::CheckpointStore;
pub use job_store::JobStore;
pub use stage_adapter::{CancellationSignal, NeverCancelled, StageAdapter};
