// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SQLite schema for the job store. Applied idempotently on startup via
//! `CREATE TABLE IF NOT EXISTS`; this crate has no separate migration
//! runner since the schema is small and stable.

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id                  TEXT PRIMARY KEY,
    status              TEXT NOT NULL,
    current_stage       INTEGER NOT NULL,
    input_path          TEXT NOT NULL,
    style_name          TEXT NOT NULL,
    input_tokens        INTEGER NOT NULL,
    output_tokens       INTEGER NOT NULL,
    degraded_stage_count INTEGER NOT NULL,
    total_retry_count   INTEGER NOT NULL DEFAULT 0,
    completed_stages    TEXT NOT NULL DEFAULT '',
    final_video_path    TEXT,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS job_error_history (
    id                      INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id                  TEXT NOT NULL REFERENCES jobs(id),
    stage                   INTEGER NOT NULL,
    kind                    TEXT NOT NULL,
    detail                  TEXT NOT NULL,
    retry_attempt           INTEGER NOT NULL,
    used_fallback           INTEGER NOT NULL,
    restored_from_checkpoint INTEGER NOT NULL,
    at                      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_job_error_history_job_id ON job_error_history(job_id);

CREATE TABLE IF NOT EXISTS job_leases (
    job_id      TEXT PRIMARY KEY REFERENCES jobs(id),
    worker_id   TEXT NOT NULL,
    expires_at  TEXT NOT NULL
);
"#;
