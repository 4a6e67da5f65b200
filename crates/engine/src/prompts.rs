//! Prompt templates sent to the remote model.

use promptmaster_core::profile::{ModelProfile, StructuralForm};

/// Heading of the image-mode task.
pub const REVERSE_ENGINEER_HEADING: &str = "TASK: REVERSE ENGINEER PROMPT";

/// Heading of the text-mode task.
pub const SYNTHESIZE_HEADING: &str = "TASK: GENERATE OPTIMIZED PROMPT";

/// Instruction that keeps the model's analysis out of its answer.
pub const INTERNAL_REASONING_INSTRUCTION: &str = "- First, think through what the user wants versus what the target model needs and which technical terms to add. \
Do this internally. Do NOT output this reasoning.";

/// The fixed bilingual output contract.
pub const OUTPUT_CONTRACT: &str = "- Then output ONLY the final prompt block, in exactly this form, with nothing before or after it:\n\
[CN] <Chinese version>\n\
[EN] <English version>";

/// Instruction for document ingestion.
pub const INGESTION_PROMPT: &str = "TASK: EXTRACT KNOWLEDGE FOR SYSTEM PROMPT\n\
The user has uploaded a PDF containing expert knowledge about AI image/video prompt engineering.\n\
ACTION: Extract the key terms and techniques (camera, lens, lighting, composition, style, model-specific strategies).\n\
Respond with a JSON object with two fields:\n\
- \"knowledge_block\": concise Markdown that can be appended to a prompt-engineering knowledge base.\n\
- \"summary\": one short sentence describing what was learned.";

/// System instruction for document ingestion.
pub const INGESTION_SYSTEM_PROMPT: &str = "You are a knowledge curator for an expert AI prompt director. \
You condense reference documents into dense, well-structured Markdown vocabulary lists.";

/// Formatting directive for a profile's structural preference.
pub fn structure_directive(structure: StructuralForm) -> &'static str {
    match structure {
        StructuralForm::Structured => {
            "Format the English prompt as a JSON object or strict list \
             (e.g. \"Subject\", \"Material\", \"Camera\", \"Lighting\" keys)."
        }
        StructuralForm::NaturalLanguage => {
            "Write the prompt as fluent natural language with a clear logical order."
        }
        StructuralForm::MotionPhysics => {
            "Structure the prompt as [Camera Move] + [Subject Action] + [Environment Physics]."
        }
        StructuralForm::ParameterizedTokens => {
            "Describe subject, environment, lighting/color and art style, then append \
             parameters as `--param value` tokens (e.g. --ar 16:9 --s 250 --v 7)."
        }
    }
}

/// Directive forbidding negative phrasing.
pub const AVOID_NEGATIVES_DIRECTIVE: &str = "Phrase everything positively: describe what is there, never what is not \
(write \"ensure sharp focus throughout\", not \"no blur\").";

/// Explicit length instruction for capped profiles.
pub fn budget_directive(max_chars: usize) -> String {
    format!("Keep the [EN] English prompt under {max_chars} characters.")
}

/// The strategy block for one target model.
pub fn strategy_block(profile: &ModelProfile) -> String {
    let mut lines = vec![
        format!(
            "TARGET MODEL STRATEGY ({}):",
            profile.display_name.to_uppercase()
        ),
        format!("- {}", profile.guidance),
        format!("- {}", structure_directive(profile.structure)),
    ];
    if profile.avoid_negative_phrasing {
        lines.push(format!("- {AVOID_NEGATIVES_DIRECTIVE}"));
    }
    if let Some(max_chars) = profile.max_chars {
        lines.push(format!("- {}", budget_directive(max_chars)));
    }
    lines.join("\n")
}
