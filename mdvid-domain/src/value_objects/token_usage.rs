// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Token Usage
//!
//! Accumulated LLM token counters. Monotonically non-decreasing for the
//! lifetime of a job (invariant 8): the only mutator is [`TokenUsage::add`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
}

impl TokenUsage {
    pub fn new(input: u64, output: u64) -> Self {
        Self { input, output }
    }

    pub fn total(&self) -> u64 {
        self.input + self.output
    }

    /// Fold another usage reading into this one. Never subtracts.
    pub fn add(&mut self, other: TokenUsage) {
        self.input += other.input;
        self.output += other.output;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_accumulates() {
        let mut usage = TokenUsage::default();
        usage.add(TokenUsage::new(10, 20));
        usage.add(TokenUsage::new(5, 5));
        assert_eq!(usage.total(), 40);
        assert_eq!(usage.input, 15);
        assert_eq!(usage.output, 25);
    }
}
