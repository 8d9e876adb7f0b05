// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Registry
//!
//! The canonical, ordered list of all eleven pipeline stages. Built once and
//! never mutated; the Pipeline Engine walks it by index and never hard-codes
//! stage identity.

use crate::value_objects::{Criticality, StageDescriptor, StageOrder};
use std::time::Duration;

/// Ordered registry of stage descriptors, indexed by [`StageOrder`].
#[derive(Debug, Clone)]
pub struct StageRegistry {
    stages: Vec<StageDescriptor>,
}

impl StageRegistry {
    /// Build the registry with the standard eleven-stage sequence and its
    /// default retry/fallback/criticality policy.
    pub fn standard() -> Self {
        let order = |n: u32| StageOrder::new(n).expect("standard stage indices are always valid");

        let stages = vec![
            StageDescriptor::new(order(0), "load_style_prompts", Criticality::Fatal).with_fallback(),
            StageDescriptor::new(order(1), "validate_normalize_input", Criticality::Fatal),
            StageDescriptor::new(order(2), "synthesize_summary", Criticality::Fatal).with_fallback(),
            StageDescriptor::new(order(3), "synthesize_base_script", Criticality::Fatal).with_fallback(),
            StageDescriptor::new(order(4), "plan_images_layouts", Criticality::Degradable).with_fallback(),
            StageDescriptor::new(order(5), "fetch_images", Criticality::Degradable)
                .with_fallback()
                .with_max_wall_clock(Duration::from_secs(120)),
            StageDescriptor::new(order(6), "enhance_script_with_images", Criticality::Degradable).with_fallback(),
            StageDescriptor::new(order(7), "render_silent_video", Criticality::Fatal)
                .with_fallback()
                .with_max_wall_clock(Duration::from_secs(900)),
            StageDescriptor::new(order(8), "synthesize_narration_text", Criticality::Fatal).with_fallback(),
            StageDescriptor::new(order(9), "synthesize_audio_clips", Criticality::Degradable)
                .with_fallback()
                .with_max_wall_clock(Duration::from_secs(180)),
            StageDescriptor::new(order(10), "mux_audio_video", Criticality::Fatal).with_fallback(),
        ];

        StageRegistry { stages }
    }

    pub fn get(&self, order: StageOrder) -> &StageDescriptor {
        &self.stages[order.value() as usize]
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StageDescriptor> {
        self.stages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_has_eleven_stages() {
        let registry = StageRegistry::standard();
        assert_eq!(registry.len(), 11);
    }

    #[test]
    fn stages_are_indexed_by_their_own_order() {
        let registry = StageRegistry::standard();
        for (i, descriptor) in registry.iter().enumerate() {
            assert_eq!(descriptor.order.value() as usize, i);
        }
    }

    #[test]
    fn render_stage_is_fatal() {
        let registry = StageRegistry::standard();
        let render = registry.get(StageOrder::new(7).unwrap());
        assert_eq!(render.name, "render_silent_video");
        assert!(render.is_fatal());
    }
}
