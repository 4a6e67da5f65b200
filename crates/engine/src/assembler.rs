//! Prompt assembler: turns engine state and the current corpus into exactly
//! one remote-model request.
//!
//! Assembly does no I/O. Every validation failure is reported before a
//! request exists.

use promptmaster_core::error::EngineError;
use promptmaster_core::provider::{ContentPart, ProviderRequest, ResponseFormat};
use promptmaster_core::state::{EngineState, ImageInput, InputMode, validate_credential};
use tracing::debug;

use crate::prompts;

/// Generation parameters sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    /// Remote model name
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub relax_safety: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-preview-09-2025".into(),
            temperature: 0.7,
            max_output_tokens: 2000,
            relax_safety: true,
        }
    }
}

/// Build the synthesis request for `state`.
///
/// `system_instruction` is the corpus verbatim; `parts` is the task template,
/// followed by the image in image mode.
pub fn assemble(
    state: &EngineState,
    corpus: &str,
    credential: Option<&str>,
    params: &GenerationParams,
) -> Result<ProviderRequest, EngineError> {
    validate_credential(credential)?;
    let image = validate_input(state)?;

    let mut parts = vec![ContentPart::text(build_task_text(state))];
    if let Some(image) = image {
        parts.push(ContentPart::inline(image.mime_type.clone(), image.bytes.clone()));
    }

    debug!(
        mode = ?state.mode,
        target_model = %state.target_model,
        tags = state.selected_tags.len(),
        "Assembled synthesis request"
    );

    Ok(ProviderRequest {
        model: params.model.clone(),
        system_instruction: Some(corpus.to_string()),
        parts,
        temperature: params.temperature,
        max_tokens: Some(params.max_output_tokens),
        response_format: ResponseFormat::Text,
        relax_safety: params.relax_safety,
    })
}

/// Check the state carries the input its mode needs.
fn validate_input(state: &EngineState) -> Result<Option<&ImageInput>, EngineError> {
    match state.mode {
        InputMode::Image => state
            .image
            .as_ref()
            .map(Some)
            .ok_or_else(|| EngineError::InputValidation("Please upload an image first.".into())),
        InputMode::Text if state.query.trim().is_empty() => Err(EngineError::InputValidation(
            "Please enter a text description.".into(),
        )),
        InputMode::Text => Ok(None),
    }
}

/// The task template for `state`.
pub fn build_task_text(state: &EngineState) -> String {
    let profile = state.target_model.profile();
    let model_name = profile.display_name.to_uppercase();
    let labels = state.selected_tags.labels();
    let tags = if labels.is_empty() {
        "None".to_string()
    } else {
        labels.join(", ")
    };
    let query = state.query.trim();

    let task = match state.mode {
        InputMode::Image => {
            let notes = if query.is_empty() { "None" } else { query };
            format!(
                "{}\n\
                 1. Analyze the uploaded image like a professional cinematographer.\n\
                 2. Identify: focal length, lighting type, composition, texture details and atmosphere.\n\
                 3. Convert this analysis into a highly optimized prompt for the '{model_name}' model architecture.\n\
                 4. User additional notes: {notes}\n\
                 5. Selected style tags to enforce: {tags}",
                prompts::REVERSE_ENGINEER_HEADING
            )
        }
        InputMode::Text => format!(
            "{}\n\
             1. User input: \"{query}\"\n\
             2. Target model: {model_name}\n\
             3. Selected tags (must include): {tags}",
            prompts::SYNTHESIZE_HEADING
        ),
    };

    format!(
        "{task}\n\n{}\n\nPROCEDURE:\n{}\n{}",
        prompts::strategy_block(profile),
        prompts::INTERNAL_REASONING_INSTRUCTION,
        prompts::OUTPUT_CONTRACT
    )
}
