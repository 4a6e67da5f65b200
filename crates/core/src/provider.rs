//! Provider trait: the abstraction over the remote language/vision model.
//!
//! A Provider accepts a system instruction, an ordered list of content parts
//! (text and/or inline binary with a MIME type) and generation parameters, and
//! returns generated text or fails.
//!
//! Implementations: Gemini (REST). Tests use scripted doubles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// One part of the user turn sent to the remote model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text { text: String },

    /// Raw bytes with their media type (images, PDFs).
    InlineData { mime_type: String, data: Vec<u8> },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn inline(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self::InlineData {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// The text of a `Text` part, `None` for inline data.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::InlineData { .. } => None,
        }
    }
}

/// How the remote model should shape its output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free text (default).
    #[default]
    Text,

    /// A JSON document matching the given schema.
    Json { schema: serde_json::Value },
}

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The remote model to use (e.g., "gemini-2.5-flash-preview-09-2025")
    pub model: String,

    /// System instruction; for synthesis this is the knowledge corpus verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,

    /// The user turn, in order
    pub parts: Vec<ContentPart>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Requested output shape
    #[serde(default)]
    pub response_format: ResponseFormat,

    /// Ask the provider to disable its harm-category blocking thresholds
    #[serde(default)]
    pub relax_safety: bool,
}

fn default_temperature() -> f32 {
    0.7
}

impl ProviderRequest {
    /// Concatenated text of every `Text` part.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(ContentPart::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// The generated text
    pub text: String,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,

    /// Why generation stopped, as reported by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The core Provider trait.
///
/// The engine calls `complete()` without knowing which backend is behind it.
/// Exactly one call is made per synthesis or ingestion.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "gemini").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Health check: can we reach the provider with this credential?
    ///
    /// A rejected credential is reported as an error rather than `false`.
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_text_skips_inline_parts() {
        let req = ProviderRequest {
            model: "gemini".into(),
            system_instruction: None,
            parts: vec![
                ContentPart::text("describe this"),
                ContentPart::inline("image/png", vec![1, 2, 3]),
            ],
            temperature: default_temperature(),
            max_tokens: None,
            response_format: ResponseFormat::default(),
            relax_safety: false,
        };
        assert_eq!(req.text(), "describe this");
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn content_part_serialization() {
        let part = ContentPart::inline("application/pdf", vec![0x25, 0x50]);
        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains("inline_data"));
        assert!(json.contains("application/pdf"));
    }
}
