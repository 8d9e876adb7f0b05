// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Order
//!
//! `StageOrder` is a validated newtype over the fixed eleven-stage sequence.
//! Keeping it as a value object (rather than a bare `u32` or `usize`) means
//! "is this a valid stage index" is answered in exactly one place.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Total number of stages in the pipeline (0..TOTAL_STAGES).
pub const TOTAL_STAGES: u32 = 11;

/// Position of a stage within the fixed pipeline sequence, `0..=10`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StageOrder(u32);

impl StageOrder {
    /// Construct a `StageOrder`, rejecting anything outside `0..TOTAL_STAGES`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PipelineError::InvalidStageOrder`] if `value`
    /// is out of range.
    pub fn new(value: u32) -> Result<Self, crate::error::PipelineError> {
        if value >= TOTAL_STAGES {
            return Err(crate::error::PipelineError::InvalidStageOrder(format!(
                "stage index {value} is out of range 0..{TOTAL_STAGES}"
            )));
        }
        Ok(StageOrder(value))
    }

    /// The first stage (index 0).
    pub fn first() -> Self {
        StageOrder(0)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Whether this is the last stage in the sequence.
    pub fn is_last(&self) -> bool {
        self.0 == TOTAL_STAGES - 1
    }

    /// The next stage in sequence, or `None` if this is the last stage.
    pub fn next(&self) -> Option<Self> {
        if self.is_last() {
            None
        } else {
            Some(StageOrder(self.0 + 1))
        }
    }

    pub fn comes_before(&self, other: &StageOrder) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for StageOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for StageOrder {
    type Error = crate::error::PipelineError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        StageOrder::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert!(StageOrder::new(11).is_err());
        assert!(StageOrder::new(999).is_err());
    }

    #[test]
    fn accepts_boundary_values() {
        assert!(StageOrder::new(0).is_ok());
        assert!(StageOrder::new(10).is_ok());
    }

    #[test]
    fn next_returns_none_past_last_stage() {
        let last = StageOrder::new(10).unwrap();
        assert!(last.is_last());
        assert_eq!(last.next(), None);
    }

    #[test]
    fn next_advances_by_one() {
        let first = StageOrder::first();
        let second = first.next().unwrap();
        assert_eq!(second.value(), 1);
        assert!(first.comes_before(&second));
    }

    #[test]
    fn orders_by_value() {
        let a = StageOrder::new(2).unwrap();
        let b = StageOrder::new(5).unwrap();
        assert!(a < b);
    }
}
