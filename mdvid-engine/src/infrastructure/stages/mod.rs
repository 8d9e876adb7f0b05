// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The eleven `StageAdapter` implementations, grouped by the collaborator
//! they lean on rather than one file each: style/input handling, the four
//! LLM-backed stages, the two imagery stages, and the three rendering/mux
//! stages.

pub mod imagery;
pub mod rendering;
pub mod scripting;
pub mod style_and_input;

use mdvid_domain::repositories::StageAdapter;
use std::collections::HashMap;
use std::sync::Arc;

/// Build the full `stage index -> adapter` map the [`super::runtime::PipelineEngine`]
/// dispatches through, wiring each stage to the collaborator adapters it needs.
#[allow(clippy::too_many_arguments)]
pub fn build_standard_adapters(
    llm: Arc<dyn crate::infrastructure::adapters::LlmService>,
    image_search: Arc<dyn crate::infrastructure::adapters::ImageSearchService>,
    http_fetcher: Arc<dyn crate::infrastructure::adapters::HttpFetcher>,
    renderer: Arc<dyn crate::infrastructure::adapters::AnimationRenderer>,
    synthesizer: Arc<dyn crate::infrastructure::adapters::SpeechSynthesizer>,
    muxer: Arc<dyn crate::infrastructure::adapters::AvMuxer>,
    probe: Arc<dyn crate::infrastructure::adapters::MediaProbe>,
    workspace_root: std::path::PathBuf,
    default_voice_id: String,
    markdown_input_truncation_chars: usize,
    render_quality_fallback: String,
) -> HashMap<u32, Arc<dyn StageAdapter>> {
    let mut adapters: HashMap<u32, Arc<dyn StageAdapter>> = HashMap::new();

    adapters.insert(0, Arc::new(style_and_input::LoadStylePromptsStage::new(workspace_root.clone())));
    adapters.insert(
        1,
        Arc::new(style_and_input::ValidateNormalizeInputStage::new(markdown_input_truncation_chars)),
    );
    adapters.insert(2, Arc::new(scripting::SynthesizeSummaryStage::new(llm.clone())));
    adapters.insert(3, Arc::new(scripting::SynthesizeBaseScriptStage::new(llm.clone())));
    adapters.insert(
        4,
        Arc::new(imagery::PlanImagesLayoutsStage::new(llm.clone())),
    );
    adapters.insert(
        5,
        Arc::new(imagery::FetchImagesStage::new(
            image_search,
            http_fetcher,
            workspace_root.clone(),
        )),
    );
    adapters.insert(6, Arc::new(scripting::EnhanceScriptWithImagesStage::new(llm.clone())));
    adapters.insert(
        7,
        Arc::new(rendering::RenderSilentVideoStage::new(
            renderer,
            workspace_root.clone(),
            render_quality_fallback,
        )),
    );
    adapters.insert(8, Arc::new(scripting::SynthesizeNarrationTextStage::new(llm)));
    adapters.insert(
        9,
        Arc::new(rendering::SynthesizeAudioClipsStage::new(
            synthesizer,
            probe.clone(),
            default_voice_id,
        )),
    );
    adapters.insert(10, Arc::new(rendering::MuxAudioVideoStage::new(muxer, probe, workspace_root)));

    adapters
}
