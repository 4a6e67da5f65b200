//! Result handling for synthesis calls.
//!
//! Successful responses are surfaced verbatim; the bilingual format and the
//! character budget are checked but never enforced by rewriting the text.

use promptmaster_core::error::{EngineError, ProviderError};
use promptmaster_core::profile::ModelProfile;
use promptmaster_core::provider::{ProviderResponse, Usage};
use serde::Serialize;
use tracing::warn;

const CN_MARKER: &str = "[CN]";
const EN_MARKER: &str = "[EN]";

/// A synthesized prompt as returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPrompt {
    /// The model's answer, unmodified.
    pub text: String,
    /// Whether both `[CN]` and `[EN]` markers are present, in that order.
    pub has_bilingual_markers: bool,
    /// Whether the English segment exceeds the profile's character cap.
    pub exceeds_budget: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl GeneratedPrompt {
    /// The `[EN]` segment, if the answer has one.
    pub fn english(&self) -> Option<&str> {
        english_segment(&self.text)
    }
}

/// Turn a provider outcome into the caller-facing result.
pub fn handle(
    outcome: Result<ProviderResponse, ProviderError>,
    profile: &ModelProfile,
) -> Result<GeneratedPrompt, EngineError> {
    let response = outcome.map_err(classify)?;
    if response.text.trim().is_empty() {
        return Err(EngineError::Remote("The model returned an empty response".into()));
    }

    let text = response.text;
    let has_bilingual_markers = has_markers(&text);
    if !has_bilingual_markers {
        warn!(target_model = profile.id, "Response is missing [CN]/[EN] markers");
    }

    let exceeds_budget = match (profile.max_chars, english_segment(&text)) {
        (Some(max), Some(en)) => en.chars().count() > max,
        (Some(max), None) => text.chars().count() > max,
        (None, _) => false,
    };
    if exceeds_budget {
        warn!(
            target_model = profile.id,
            max_chars = ?profile.max_chars,
            "Response exceeds the target model's character budget"
        );
    }

    Ok(GeneratedPrompt {
        text,
        has_bilingual_markers,
        exceeds_budget,
        usage: response.usage,
    })
}

/// Map a provider failure onto the caller-facing error taxonomy.
///
/// Authentication failures are checked before safety ones.
pub fn classify(error: ProviderError) -> EngineError {
    match error {
        ProviderError::AuthenticationFailed(msg) => EngineError::Auth(msg),
        ProviderError::ApiError { status_code, message }
            if status_code == 401 || status_code == 403 =>
        {
            EngineError::Auth(message)
        }
        ProviderError::SafetyBlocked(msg) => EngineError::SafetyBlocked(msg),
        other => {
            let msg = other.to_string();
            if msg.contains("401") || msg.contains("API key not valid") {
                EngineError::Auth(msg)
            } else if msg.contains("SAFETY") {
                EngineError::SafetyBlocked(msg)
            } else {
                EngineError::Remote(msg)
            }
        }
    }
}

/// The text after the `[EN]` marker, trimmed.
pub fn english_segment(text: &str) -> Option<&str> {
    text.find(EN_MARKER)
        .map(|at| text[at + EN_MARKER.len()..].trim())
}

fn has_markers(text: &str) -> bool {
    match (text.find(CN_MARKER), text.find(EN_MARKER)) {
        (Some(cn), Some(en)) => cn < en,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptmaster_core::TargetModel;

    fn response(text: &str) -> ProviderResponse {
        ProviderResponse {
            text: text.into(),
            usage: None,
            model: "gemini-test".into(),
            finish_reason: Some("STOP".into()),
        }
    }

    #[test]
    fn bilingual_answer_is_returned_verbatim() {
        let text = "[CN] 一只猫\n[EN] A cat on a windowsill";
        let prompt = handle(Ok(response(text)), TargetModel::Flux.profile()).unwrap();
        assert_eq!(prompt.text, text);
        assert!(prompt.has_bilingual_markers);
        assert!(!prompt.exceeds_budget);
        assert_eq!(prompt.english(), Some("A cat on a windowsill"));
    }

    #[test]
    fn missing_markers_is_flagged_not_rejected() {
        let prompt = handle(Ok(response("just a prompt")), TargetModel::Video.profile()).unwrap();
        assert!(!prompt.has_bilingual_markers);
        assert_eq!(prompt.text, "just a prompt");
    }

    #[test]
    fn reversed_markers_do_not_count() {
        assert!(!has_markers("[EN] a\n[CN] b"));
    }

    #[test]
    fn over_budget_english_is_flagged_not_truncated() {
        let en = "x".repeat(801);
        let text = format!("[CN] 短\n[EN] {en}");
        let prompt = handle(Ok(response(&text)), TargetModel::Seedream.profile()).unwrap();
        assert!(prompt.exceeds_budget);
        assert_eq!(prompt.text, text);

        let ok = format!("[CN] 短\n[EN] {}", "x".repeat(800));
        let prompt = handle(Ok(response(&ok)), TargetModel::Seedream.profile()).unwrap();
        assert!(!prompt.exceeds_budget);
    }

    #[test]
    fn empty_response_is_remote_error() {
        let err = handle(Ok(response("  \n")), TargetModel::Flux.profile()).unwrap_err();
        assert!(matches!(err, EngineError::Remote(_)));
    }

    #[test]
    fn classification() {
        assert!(matches!(
            classify(ProviderError::AuthenticationFailed("bad key".into())),
            EngineError::Auth(_)
        ));
        assert!(matches!(
            classify(ProviderError::ApiError {
                status_code: 401,
                message: "unauthorized".into()
            }),
            EngineError::Auth(_)
        ));
        assert!(matches!(
            classify(ProviderError::SafetyBlocked("SAFETY".into())),
            EngineError::SafetyBlocked(_)
        ));
        assert!(matches!(
            classify(ProviderError::MalformedResponse("finishReason SAFETY".into())),
            EngineError::SafetyBlocked(_)
        ));
        assert!(matches!(
            classify(ProviderError::Network("connection reset".into())),
            EngineError::Remote(_)
        ));
        assert!(matches!(
            classify(ProviderError::RateLimited {
                retry_after_secs: Some(30)
            }),
            EngineError::Remote(_)
        ));
    }

    #[test]
    fn auth_wins_over_safety() {
        let err = classify(ProviderError::ApiError {
            status_code: 400,
            message: "401 SAFETY".into(),
        });
        assert!(matches!(err, EngineError::Auth(_)));
    }
}
