//! Caller-owned engine state and request inputs.
//!
//! The interactive state (mode, query, image, selected tags, target model)
//! lives in one explicit record that the caller owns and passes into the
//! engine, so assembly is a pure function of its inputs.

use serde::{Deserialize, Serialize};

use crate::catalog::SelectedTags;
use crate::error::EngineError;
use crate::profile::TargetModel;

/// Uploaded images above this size are rejected.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// The only media type accepted for ingestion.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Prefix every well-formed provider API key starts with.
pub const CREDENTIAL_PREFIX: &str = "AIza";

const DEFAULT_IMAGE_MIME_TYPE: &str = "image/jpeg";

/// Which input drives the synthesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Synthesize from a natural-language description.
    #[default]
    Text,
    /// Reverse-engineer from an uploaded reference image.
    Image,
}

/// A reference image held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageInput {
    /// Wrap an uploaded image, enforcing the size ceiling.
    ///
    /// An empty media type falls back to `image/jpeg`.
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Result<Self, EngineError> {
        Self::with_limit(bytes, mime_type, MAX_IMAGE_BYTES)
    }

    /// Like [`ImageInput::new`] with a custom ceiling.
    pub fn with_limit(
        bytes: Vec<u8>,
        mime_type: impl Into<String>,
        max_bytes: usize,
    ) -> Result<Self, EngineError> {
        if bytes.is_empty() {
            return Err(EngineError::InputValidation("Image is empty".into()));
        }
        if bytes.len() > max_bytes {
            return Err(EngineError::InputValidation(format!(
                "Image is too large ({} bytes). Please upload an image smaller than {} MB.",
                bytes.len(),
                max_bytes / (1024 * 1024)
            )));
        }
        let mime_type = mime_type.into();
        let mime_type = if mime_type.trim().is_empty() {
            DEFAULT_IMAGE_MIME_TYPE.to_string()
        } else {
            mime_type
        };
        Ok(Self { bytes, mime_type })
    }
}

impl std::fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageInput")
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// A document submitted for ingestion.
#[derive(Clone)]
pub struct Document {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Document {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type.trim().eq_ignore_ascii_case(PDF_MIME_TYPE)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

/// Everything the caller has chosen for the next synthesis.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub mode: InputMode,
    /// Description in text mode, optional notes in image mode.
    pub query: String,
    pub image: Option<ImageInput>,
    pub selected_tags: SelectedTags,
    pub target_model: TargetModel,
}

impl EngineState {
    pub fn new(target_model: TargetModel) -> Self {
        Self {
            target_model,
            ..Self::default()
        }
    }

    /// Text-mode state with the given description.
    pub fn text(target_model: TargetModel, query: impl Into<String>) -> Self {
        Self {
            mode: InputMode::Text,
            query: query.into(),
            target_model,
            ..Self::default()
        }
    }

    /// Attach an uploaded image and switch to image mode.
    pub fn upload_image(&mut self, image: ImageInput) {
        self.image = Some(image);
        self.mode = InputMode::Image;
    }

    pub fn with_tags(mut self, tags: SelectedTags) -> Self {
        self.selected_tags = tags;
        self
    }

    /// Select the target model by id. Unknown ids leave the state unchanged.
    pub fn select_model(&mut self, id: &str) -> Result<(), EngineError> {
        self.target_model = TargetModel::from_id(id)?;
        Ok(())
    }

    /// Flip one tag in the selection.
    pub fn toggle_tag(&mut self, id: &str) -> Result<bool, EngineError> {
        self.selected_tags.toggle(id)
    }
}

/// Check the credential is present and follows the provider's key convention.
pub fn validate_credential(credential: Option<&str>) -> Result<&str, EngineError> {
    let key = credential.map(str::trim).unwrap_or_default();
    if key.is_empty() {
        return Err(EngineError::Configuration(
            "No API key configured. Set one with `promptmaster key <KEY>`.".into(),
        ));
    }
    if !key.starts_with(CREDENTIAL_PREFIX) {
        return Err(EngineError::Configuration(format!(
            "Invalid API key format. It should start with '{CREDENTIAL_PREFIX}'."
        )));
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_image_is_rejected() {
        let err = ImageInput::with_limit(vec![0; 11], "image/png", 10).unwrap_err();
        assert!(matches!(err, EngineError::InputValidation(_)));
        assert!(ImageInput::with_limit(vec![0; 10], "image/png", 10).is_ok());
    }

    #[test]
    fn empty_image_mime_defaults_to_jpeg() {
        let image = ImageInput::new(vec![1, 2, 3], "").unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
    }

    #[test]
    fn uploading_an_image_switches_mode() {
        let mut state = EngineState::new(TargetModel::Video);
        assert_eq!(state.mode, InputMode::Text);
        state.upload_image(ImageInput::new(vec![1], "image/png").unwrap());
        assert_eq!(state.mode, InputMode::Image);
    }

    #[test]
    fn selecting_unknown_model_is_a_configuration_error() {
        let mut state = EngineState::new(TargetModel::Seedream);
        let err = state.select_model("stable-diffusion").unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
        assert_eq!(state.target_model, TargetModel::Seedream);

        state.select_model("midjourney").unwrap();
        assert_eq!(state.target_model, TargetModel::Midjourney);
    }

    #[test]
    fn document_pdf_detection() {
        assert!(Document::new("a.pdf", vec![1], "application/pdf").is_pdf());
        assert!(Document::new("a.pdf", vec![1], "Application/PDF").is_pdf());
        assert!(!Document::new("a.txt", vec![1], "text/plain").is_pdf());
    }

    #[test]
    fn credential_validation() {
        assert!(matches!(
            validate_credential(None),
            Err(EngineError::Configuration(_))
        ));
        assert!(matches!(
            validate_credential(Some("   ")),
            Err(EngineError::Configuration(_))
        ));
        assert!(matches!(
            validate_credential(Some("sk-abc")),
            Err(EngineError::Configuration(_))
        ));
        assert_eq!(validate_credential(Some(" AIzaXYZ ")).unwrap(), "AIzaXYZ");
    }
}
