//! Ingestion pipeline: a PDF in, one learned corpus section out.

use promptmaster_core::error::EngineError;
use promptmaster_core::knowledge::KnowledgeVersion;
use promptmaster_core::provider::{ContentPart, ProviderRequest, ResponseFormat};
use promptmaster_core::state::{Document, PDF_MIME_TYPE};
use serde::{Deserialize, Serialize};

use crate::prompts;

const UNTITLED_DOCUMENT: &str = "untitled.pdf";

/// How the knowledge block was obtained from the model's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    /// The answer parsed as `{ knowledge_block, summary }`.
    Structured,
    /// The answer did not parse; its raw text was appended instead.
    ParseFallback,
}

/// What an ingestion added to the knowledge base.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub version: KnowledgeVersion,
    pub summary: String,
    pub outcome: IngestOutcome,
}

/// Parameters for the extraction call.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestParams {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub relax_safety: bool,
}

impl Default for IngestParams {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-preview-09-2025".into(),
            temperature: 0.2,
            max_output_tokens: 2000,
            relax_safety: true,
        }
    }
}

/// Structured answer requested from the model.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractedKnowledge {
    pub knowledge_block: String,
    pub summary: String,
}

/// Reject anything that is not a non-empty PDF.
pub fn validate_document(document: &Document) -> Result<(), EngineError> {
    if !document.is_pdf() {
        return Err(EngineError::InputValidation(format!(
            "Only PDF files are supported (got '{}')",
            document.mime_type
        )));
    }
    if document.bytes.is_empty() {
        return Err(EngineError::InputValidation(format!(
            "'{}' is empty",
            provenance_label(document)
        )));
    }
    Ok(())
}

/// The label recorded as the section's provenance and the version's source.
pub fn provenance_label(document: &Document) -> &str {
    let name = document.file_name.trim();
    if name.is_empty() { UNTITLED_DOCUMENT } else { name }
}

/// Build the single extraction request for `document`.
pub fn build_request(document: &Document, params: &IngestParams) -> ProviderRequest {
    ProviderRequest {
        model: params.model.clone(),
        system_instruction: Some(prompts::INGESTION_SYSTEM_PROMPT.to_string()),
        parts: vec![
            ContentPart::text(prompts::INGESTION_PROMPT),
            ContentPart::inline(PDF_MIME_TYPE, document.bytes.clone()),
        ],
        temperature: params.temperature,
        max_tokens: Some(params.max_output_tokens),
        response_format: ResponseFormat::Json {
            schema: extraction_schema(),
        },
        relax_safety: params.relax_safety,
    }
}

/// Response schema for [`ExtractedKnowledge`].
pub fn extraction_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "knowledge_block": { "type": "STRING" },
            "summary": { "type": "STRING" }
        },
        "required": ["knowledge_block", "summary"]
    })
}

/// Parse the model's answer, tolerating a Markdown code fence around it.
///
/// Returns `None` when the answer is not the expected object or either field
/// is blank.
pub fn parse_payload(text: &str) -> Option<ExtractedKnowledge> {
    let parsed: ExtractedKnowledge = serde_json::from_str(strip_code_fence(text)).ok()?;
    if parsed.knowledge_block.trim().is_empty() || parsed.summary.trim().is_empty() {
        return None;
    }
    Some(parsed)
}

/// Summary recorded when the answer had to be taken as raw text.
pub fn fallback_summary(label: &str) -> String {
    format!("Knowledge extracted from {label} (unstructured response)")
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(name: &str) -> Document {
        Document::new(name, b"%PDF-1.7".to_vec(), "application/pdf")
    }

    #[test]
    fn non_pdf_is_rejected() {
        let doc = Document::new("notes.txt", b"hello".to_vec(), "text/plain");
        assert!(matches!(
            validate_document(&doc),
            Err(EngineError::InputValidation(_))
        ));
    }

    #[test]
    fn empty_pdf_is_rejected() {
        let doc = Document::new("empty.pdf", Vec::new(), "application/pdf");
        assert!(matches!(
            validate_document(&doc),
            Err(EngineError::InputValidation(_))
        ));
        assert!(validate_document(&pdf("guide.pdf")).is_ok());
    }

    #[test]
    fn blank_file_name_gets_a_label() {
        assert_eq!(provenance_label(&pdf("  ")), "untitled.pdf");
        assert_eq!(provenance_label(&pdf("lens-guide.pdf")), "lens-guide.pdf");
    }

    #[test]
    fn request_carries_pdf_and_schema() {
        let req = build_request(&pdf("guide.pdf"), &IngestParams::default());
        assert_eq!(req.parts.len(), 2);
        assert_eq!(
            req.parts[1],
            ContentPart::inline("application/pdf", b"%PDF-1.7".to_vec())
        );
        match &req.response_format {
            ResponseFormat::Json { schema } => {
                assert_eq!(schema["required"][0], "knowledge_block");
            }
            other => panic!("expected JSON format, got {other:?}"),
        }
        assert!((req.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn parses_plain_json() {
        let parsed =
            parse_payload(r#"{"knowledge_block": "- Tilt-shift lens", "summary": "Lenses"}"#)
                .unwrap();
        assert_eq!(parsed.knowledge_block, "- Tilt-shift lens");
        assert_eq!(parsed.summary, "Lenses");
    }

    #[test]
    fn parses_fenced_json() {
        let text = "```json\n{\"knowledge_block\": \"- Softbox\", \"summary\": \"Lighting\"}\n```";
        let parsed = parse_payload(text).unwrap();
        assert_eq!(parsed.knowledge_block, "- Softbox");

        let bare = "```\n{\"knowledge_block\": \"- Gel\", \"summary\": \"Color\"}\n```";
        assert_eq!(parse_payload(bare).unwrap().summary, "Color");
    }

    #[test]
    fn unparseable_or_blank_fields_fall_back() {
        assert!(parse_payload("Here is what I learned: lenses").is_none());
        assert!(parse_payload(r#"{"knowledge_block": "", "summary": "x"}"#).is_none());
        assert!(parse_payload(r#"{"summary": "x"}"#).is_none());
    }

    #[test]
    fn fallback_summary_names_the_file() {
        assert_eq!(
            fallback_summary("guide.pdf"),
            "Knowledge extracted from guide.pdf (unstructured response)"
        );
    }
}
