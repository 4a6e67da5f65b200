//! `promptmaster generate`: synthesize a bilingual prompt.

use std::path::{Path, PathBuf};

use promptmaster_core::SelectedTags;
use promptmaster_core::state::{EngineState, ImageInput};
use promptmaster_engine::GeneratedPrompt;

use super::open_engine;

pub struct GenerateArgs {
    pub text: Option<String>,
    pub image: Option<PathBuf>,
    pub notes: Option<String>,
    pub model: Option<String>,
    pub tags: Vec<String>,
    pub json: bool,
}

pub async fn run(args: GenerateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (config, engine) = open_engine().await?;

    let mut state = EngineState::new(config.default_target_model()?);
    if let Some(model) = &args.model {
        state.select_model(model)?;
    }
    state.selected_tags = SelectedTags::from_ids(&args.tags)?;

    match &args.image {
        Some(path) => {
            state.upload_image(read_image(path, config.max_image_bytes)?);
            state.query = args.notes.unwrap_or_default();
        }
        None => state.query = args.text.unwrap_or_default(),
    }

    eprint!("  Synthesizing for {}...", state.target_model.profile().display_name);
    let result = engine.synthesize(&state).await;
    eprint!("\r                                              \r");
    let prompt = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&prompt)?);
    } else {
        print_prompt(&prompt);
    }
    Ok(())
}

fn read_image(path: &Path, max_bytes: usize) -> Result<ImageInput, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)
        .map_err(|e| format!("Failed to read image {}: {e}", path.display()))?;
    let mime_type = mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_default();
    Ok(ImageInput::with_limit(bytes, mime_type, max_bytes)?)
}

fn print_prompt(prompt: &GeneratedPrompt) {
    println!("{}", prompt.text);
    if !prompt.has_bilingual_markers {
        eprintln!("\n  ⚠️  The answer is missing the [CN]/[EN] markers.");
    }
    if prompt.exceeds_budget {
        eprintln!("  ⚠️  The English prompt is longer than the target model's limit.");
    }
}
