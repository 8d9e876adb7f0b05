// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Property tests for the monotonicity invariants the unit tests only spot
//! check at a handful of fixed values: token accounting never goes
//! backwards, `degraded_stage_count` only grows, and `StageOrder::next()`
//! walks the fixed sequence strictly forward.

use mdvid_domain::entities::Job;
use mdvid_domain::value_objects::{StageOrder, TokenUsage};
use proptest::prelude::*;

proptest! {
    #[test]
    fn token_usage_add_never_decreases(
        readings in prop::collection::vec((0u64..10_000, 0u64..10_000), 0..20)
    ) {
        let mut usage = TokenUsage::default();
        let mut previous_total = 0u64;
        for (input, output) in readings {
            usage.add(TokenUsage::new(input, output));
            prop_assert!(usage.total() >= previous_total);
            previous_total = usage.total();
        }
    }

    #[test]
    fn job_record_tokens_never_decreases(
        readings in prop::collection::vec((0u64..10_000, 0u64..10_000), 0..20)
    ) {
        let mut job = Job::new("doc.md", "default");
        let mut previous_total = 0u64;
        for (input, output) in readings {
            job.record_tokens(TokenUsage::new(input, output));
            prop_assert!(job.token_usage.total() >= previous_total);
            previous_total = job.token_usage.total();
        }
    }

    #[test]
    fn job_degraded_stage_count_only_grows(mark_count in 0u32..20) {
        let mut job = Job::new("doc.md", "default");
        let mut previous = 0u32;
        for _ in 0..mark_count {
            job.mark_degraded();
            prop_assert!(job.degraded_stage_count >= previous);
            previous = job.degraded_stage_count;
        }
    }

    #[test]
    fn stage_order_next_walks_strictly_forward(start in 0u32..11) {
        let mut current = StageOrder::new(start).unwrap();
        loop {
            match current.next() {
                Some(next) => {
                    prop_assert!(current.comes_before(&next));
                    prop_assert_eq!(next.value(), current.value() + 1);
                    current = next;
                }
                None => {
                    prop_assert!(current.is_last());
                    break;
                }
            }
        }
    }

    #[test]
    fn stage_order_comes_before_is_consistent_with_value(a in 0u32..11, b in 0u32..11) {
        let a = StageOrder::new(a).unwrap();
        let b = StageOrder::new(b).unwrap();
        prop_assert_eq!(a.comes_before(&b), a.value() < b.value());
    }
}
