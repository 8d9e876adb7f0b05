// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Error Record
//!
//! Append-only audit trail of every stage failure a job experienced,
//! whether or not it was ultimately recovered from.

use crate::datetime_serde;
use crate::error::ErrorKind;
use crate::value_objects::StageOrder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded stage failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub stage: StageOrder,
    pub kind: ErrorKind,
    pub detail: String,
    pub retry_attempt: u32,
    pub used_fallback: bool,
    pub restored_from_checkpoint: bool,
    #[serde(with = "datetime_serde")]
    pub at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(stage: StageOrder, kind: ErrorKind, detail: impl Into<String>, retry_attempt: u32) -> Self {
        ErrorRecord {
            stage,
            kind,
            detail: detail.into(),
            retry_attempt,
            used_fallback: false,
            restored_from_checkpoint: false,
            at: Utc::now(),
        }
    }

    pub fn with_fallback(mut self) -> Self {
        self.used_fallback = true;
        self
    }

    pub fn with_checkpoint_restore(mut self) -> Self {
        self.restored_from_checkpoint = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_flags_default_false() {
        let record = ErrorRecord::new(StageOrder::first(), ErrorKind::Network, "timed out", 1);
        assert!(!record.used_fallback);
        assert!(!record.restored_from_checkpoint);
    }

    #[test]
    fn builder_flags_can_be_set() {
        let record = ErrorRecord::new(StageOrder::first(), ErrorKind::Quota, "rate limited", 3)
            .with_fallback()
            .with_checkpoint_restore();
        assert!(record.used_fallback);
        assert!(record.restored_from_checkpoint);
    }
}
