//! The engine facade: one remote call per synthesis or ingestion, with the
//! knowledge store as the only shared mutable state.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use promptmaster_config::AppConfig;
use promptmaster_core::error::EngineError;
use promptmaster_core::knowledge::KnowledgeVersion;
use promptmaster_core::provider::Provider;
use promptmaster_core::state::{Document, EngineState, validate_credential};
use promptmaster_knowledge::KnowledgeStore;
use tracing::{debug, info, warn};

use crate::assembler::{self, GenerationParams};
use crate::ingest::{self, IngestOutcome, IngestParams, IngestionReport};
use crate::result::{self, GeneratedPrompt};

/// Parameters the engine applies to every remote call.
#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub generation: GenerationParams,
    pub ingestion: IngestParams,
    /// Explicit credential. When unset, the store's credential slot is used.
    pub credential: Option<String>,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            generation: GenerationParams {
                model: config.remote_model.clone(),
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
                relax_safety: config.relax_safety,
            },
            ingestion: IngestParams {
                model: config.remote_model.clone(),
                temperature: config.ingest_temperature,
                max_output_tokens: config.max_output_tokens,
                relax_safety: config.relax_safety,
            },
            credential: config.api_key.clone(),
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }
}

/// Counts an operation as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Prompt synthesis and knowledge-base learning over one remote provider.
pub struct PromptEngine {
    provider: Arc<dyn Provider>,
    knowledge: Arc<KnowledgeStore>,
    settings: EngineSettings,
    generating: AtomicUsize,
    learning: AtomicUsize,
}

impl PromptEngine {
    pub fn new(
        provider: Arc<dyn Provider>,
        knowledge: Arc<KnowledgeStore>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            provider,
            knowledge,
            settings,
            generating: AtomicUsize::new(0),
            learning: AtomicUsize::new(0),
        }
    }

    /// Synthesize a bilingual prompt for `state` against the current corpus.
    pub async fn synthesize(&self, state: &EngineState) -> Result<GeneratedPrompt, EngineError> {
        let credential = self.credential().await;
        let corpus = self.knowledge.corpus().await;
        let request = assembler::assemble(
            state,
            &corpus,
            credential.as_deref(),
            &self.settings.generation,
        )?;

        let _guard = InFlight::enter(&self.generating);
        info!(
            provider = self.provider.name(),
            target_model = %state.target_model,
            mode = ?state.mode,
            "Synthesizing prompt"
        );
        let outcome = self.provider.complete(request).await;
        let prompt = result::handle(outcome, state.target_model.profile());
        if let Err(e) = &prompt {
            warn!(kind = ?e.kind(), error = %e, "Synthesis failed");
        }
        prompt
    }

    /// Learn from a PDF and append what was extracted to the corpus.
    ///
    /// Nothing is appended unless the remote call succeeds with a non-blank
    /// answer.
    pub async fn ingest(&self, document: Document) -> Result<IngestionReport, EngineError> {
        ingest::validate_document(&document)?;
        let credential = self.credential().await;
        validate_credential(credential.as_deref())?;

        let _guard = InFlight::enter(&self.learning);
        let label = ingest::provenance_label(&document).to_string();
        info!(
            provider = self.provider.name(),
            document = %label,
            bytes = document.bytes.len(),
            "Ingesting document"
        );

        let request = ingest::build_request(&document, &self.settings.ingestion);
        let response = self
            .provider
            .complete(request)
            .await
            .map_err(result::classify)?;
        if response.text.trim().is_empty() {
            return Err(EngineError::Remote(
                "The model returned an empty response".into(),
            ));
        }

        let (block, summary, outcome) = match ingest::parse_payload(&response.text) {
            Some(parsed) => (parsed.knowledge_block, parsed.summary, IngestOutcome::Structured),
            None => {
                warn!(document = %label, "Extraction response was not structured, appending raw text");
                (
                    response.text,
                    ingest::fallback_summary(&label),
                    IngestOutcome::ParseFallback,
                )
            }
        };

        let version = self
            .knowledge
            .append_knowledge(&block, &label, &summary)
            .await;
        debug!(id = %version.id, outcome = ?outcome, "Ingestion committed");

        Ok(IngestionReport {
            version,
            summary,
            outcome,
        })
    }

    /// Check the credential against the remote service.
    ///
    /// `Ok(false)` means the service answered but is not usable right now.
    pub async fn check_connection(&self) -> Result<bool, EngineError> {
        let credential = self.credential().await;
        validate_credential(credential.as_deref())?;
        let healthy = self
            .provider
            .health_check()
            .await
            .map_err(result::classify)?;
        debug!(provider = self.provider.name(), healthy, "Connection checked");
        Ok(healthy)
    }

    pub async fn corpus(&self) -> String {
        self.knowledge.corpus().await
    }

    /// Replace the whole corpus.
    pub async fn set_corpus(&self, text: impl Into<String>) {
        self.knowledge.replace_corpus(text).await;
    }

    /// Restore the default corpus, keeping history.
    pub async fn reset_corpus(&self) {
        self.knowledge.reset().await;
    }

    /// Learning history, newest first.
    pub async fn version_history(&self) -> Vec<KnowledgeVersion> {
        self.knowledge.version_history().await
    }

    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst) > 0
    }

    pub fn is_learning(&self) -> bool {
        self.learning.load(Ordering::SeqCst) > 0
    }

    /// Whether the most recent knowledge save failed.
    pub fn last_persist_failed(&self) -> bool {
        self.knowledge.last_persist_failed()
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeStore> {
        &self.knowledge
    }

    async fn credential(&self) -> Option<String> {
        match &self.settings.credential {
            Some(key) if !key.trim().is_empty() => Some(key.clone()),
            _ => self.knowledge.credential().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use promptmaster_core::error::ProviderError;
    use promptmaster_core::provider::ResponseFormat;
    use promptmaster_core::state::{ImageInput, InputMode};
    use promptmaster_core::{SelectedTags, TargetModel};
    use promptmaster_knowledge::{DEFAULT_CORPUS, InMemoryStorage, LEARNED_SECTION_HEADING};

    const KEY: &str = "AIzaTestKey";

    async fn engine_with(provider: Arc<ScriptedProvider>) -> PromptEngine {
        let storage = Arc::new(InMemoryStorage::new());
        let knowledge = Arc::new(KnowledgeStore::load(storage).await);
        PromptEngine::new(
            provider,
            knowledge,
            EngineSettings::default().with_credential(KEY),
        )
    }

    fn pdf(name: &str) -> Document {
        Document::new(name, b"%PDF-1.7 test".to_vec(), "application/pdf")
    }

    #[tokio::test]
    async fn synthesis_uses_current_corpus() {
        let provider = Arc::new(ScriptedProvider::text("[CN] 猫\n[EN] A cat"));
        let engine = engine_with(provider.clone()).await;
        engine.set_corpus("# Custom KB").await;

        let prompt = engine
            .synthesize(&EngineState::text(TargetModel::Flux, "a cat"))
            .await
            .unwrap();

        assert_eq!(prompt.text, "[CN] 猫\n[EN] A cat");
        assert_eq!(provider.calls(), 1);
        let request = provider.last_request().unwrap();
        assert_eq!(request.system_instruction.as_deref(), Some("# Custom KB"));
    }

    #[tokio::test]
    async fn synthesis_sees_learned_knowledge() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(ScriptedProvider::response(
                r#"{"knowledge_block": "- Anamorphic flare", "summary": "Lens flares"}"#,
            )),
            Ok(ScriptedProvider::response("[CN] 光晕\n[EN] Flare")),
        ]));
        let engine = engine_with(provider.clone()).await;

        engine.ingest(pdf("flares.pdf")).await.unwrap();
        engine
            .synthesize(&EngineState::text(TargetModel::Video, "a car at night"))
            .await
            .unwrap();

        let system = provider.last_request().unwrap().system_instruction.unwrap();
        assert!(system.contains("- Anamorphic flare"));
        assert!(system.contains("(flares.pdf)"));
    }

    #[tokio::test]
    async fn image_mode_without_image_makes_no_call() {
        let provider = Arc::new(ScriptedProvider::text("unused"));
        let engine = engine_with(provider.clone()).await;
        let state = EngineState {
            mode: InputMode::Image,
            ..EngineState::default()
        };

        let err = engine.synthesize(&state).await.unwrap_err();
        assert!(matches!(err, EngineError::InputValidation(_)));
        assert_eq!(provider.calls(), 0);
        assert!(!engine.is_generating());
    }

    #[tokio::test]
    async fn image_mode_sends_image_inline() {
        let provider = Arc::new(ScriptedProvider::text("[CN] 人像\n[EN] Portrait"));
        let engine = engine_with(provider.clone()).await;
        let mut state = EngineState::new(TargetModel::NanoBanana);
        state.upload_image(ImageInput::new(vec![0xff, 0xd8, 0xff], "image/jpeg").unwrap());

        engine.synthesize(&state).await.unwrap();
        let request = provider.last_request().unwrap();
        assert_eq!(request.parts.len(), 2);
        assert_eq!(request.response_format, ResponseFormat::Text);
    }

    #[tokio::test]
    async fn malformed_credential_fails_before_any_call() {
        let provider = Arc::new(ScriptedProvider::text("unused"));
        let storage = Arc::new(InMemoryStorage::new());
        let knowledge = Arc::new(KnowledgeStore::load(storage).await);
        let engine = PromptEngine::new(
            provider.clone(),
            knowledge,
            EngineSettings::default().with_credential("sk-not-a-gemini-key"),
        );

        let err = engine
            .synthesize(&EngineState::text(TargetModel::Flux, "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
        let err = engine.ingest(pdf("a.pdf")).await.unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn stored_credential_is_used_when_none_is_configured() {
        let provider = Arc::new(ScriptedProvider::text("[CN] a\n[EN] b"));
        let storage = Arc::new(InMemoryStorage::new());
        let knowledge = Arc::new(KnowledgeStore::load(storage).await);
        knowledge.save_credential(KEY).await.unwrap();
        let engine = PromptEngine::new(provider.clone(), knowledge, EngineSettings::default());

        engine
            .synthesize(&EngineState::text(TargetModel::Flux, "x"))
            .await
            .unwrap();
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn auth_failure_is_classified() {
        let provider = Arc::new(ScriptedProvider::error(ProviderError::ApiError {
            status_code: 401,
            message: "API key not valid".into(),
        }));
        let engine = engine_with(provider).await;
        let err = engine
            .synthesize(&EngineState::text(TargetModel::Flux, "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Auth(_)));
    }

    #[tokio::test]
    async fn non_pdf_ingestion_makes_no_call() {
        let provider = Arc::new(ScriptedProvider::text("unused"));
        let engine = engine_with(provider.clone()).await;
        let doc = Document::new("notes.txt", b"lens notes".to_vec(), "text/plain");

        let err = engine.ingest(doc).await.unwrap_err();
        assert!(matches!(err, EngineError::InputValidation(_)));
        assert_eq!(provider.calls(), 0);
        assert!(engine.version_history().await.is_empty());
    }

    #[tokio::test]
    async fn structured_ingestion_appends_and_records() {
        let provider = Arc::new(ScriptedProvider::text(
            "```json\n{\"knowledge_block\": \"- Tilt-shift: miniature look\", \"summary\": \"Tilt-shift lenses\"}\n```",
        ));
        let engine = engine_with(provider.clone()).await;

        let report = engine.ingest(pdf("lenses.pdf")).await.unwrap();
        assert_eq!(report.outcome, IngestOutcome::Structured);
        assert_eq!(report.summary, "Tilt-shift lenses");
        assert_eq!(report.version.source_name, "lenses.pdf");

        let corpus = engine.corpus().await;
        assert!(corpus.starts_with(DEFAULT_CORPUS));
        assert!(corpus.ends_with(&format!(
            "{LEARNED_SECTION_HEADING} (lenses.pdf):\n- Tilt-shift: miniature look\n"
        )));
        let history = engine.version_history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], report.version);

        let request = provider.last_request().unwrap();
        assert!(matches!(request.response_format, ResponseFormat::Json { .. }));
    }

    #[tokio::test]
    async fn unstructured_answer_falls_back() {
        let provider = Arc::new(ScriptedProvider::text("Key terms: softbox, rim light."));
        let engine = engine_with(provider).await;

        let report = engine.ingest(pdf("lighting.pdf")).await.unwrap();
        assert_eq!(report.outcome, IngestOutcome::ParseFallback);
        assert_eq!(
            report.summary,
            "Knowledge extracted from lighting.pdf (unstructured response)"
        );
        assert!(engine.corpus().await.contains("Key terms: softbox, rim light."));
    }

    #[tokio::test]
    async fn failed_ingestion_leaves_knowledge_untouched() {
        let provider = Arc::new(ScriptedProvider::error(ProviderError::AuthenticationFailed(
            "API key not valid".into(),
        )));
        let engine = engine_with(provider).await;
        let before = engine.corpus().await;

        let err = engine.ingest(pdf("a.pdf")).await.unwrap_err();
        assert!(matches!(err, EngineError::Auth(_)));
        assert_eq!(engine.corpus().await, before);
        assert!(engine.version_history().await.is_empty());
        assert!(!engine.is_learning());
    }

    #[tokio::test]
    async fn blank_ingestion_answer_is_remote_error() {
        let provider = Arc::new(ScriptedProvider::text("   "));
        let engine = engine_with(provider).await;

        let err = engine.ingest(pdf("a.pdf")).await.unwrap_err();
        assert!(matches!(err, EngineError::Remote(_)));
        assert!(engine.version_history().await.is_empty());
    }

    #[tokio::test]
    async fn safety_block_is_classified() {
        let provider = Arc::new(ScriptedProvider::error(ProviderError::SafetyBlocked(
            "SAFETY".into(),
        )));
        let engine = engine_with(provider).await;
        let state = EngineState::text(TargetModel::Flux, "x")
            .with_tags(SelectedTags::from_ids(["cyberpunk"]).unwrap());

        let err = engine.synthesize(&state).await.unwrap_err();
        assert!(matches!(err, EngineError::SafetyBlocked(_)));
    }

    #[tokio::test]
    async fn connection_check_classifies_rejected_key() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()).with_health(Err(
            ProviderError::AuthenticationFailed("API key not valid".into()),
        )));
        let engine = engine_with(provider.clone()).await;

        let err = engine.check_connection().await.unwrap_err();
        assert!(matches!(err, EngineError::Auth(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn connection_check_needs_a_credential() {
        let provider = Arc::new(ScriptedProvider::new(Vec::new()));
        let knowledge = Arc::new(KnowledgeStore::load(Arc::new(InMemoryStorage::new())).await);
        let engine = PromptEngine::new(provider, knowledge, EngineSettings::default());

        let err = engine.check_connection().await.unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));

        let healthy = engine_with(Arc::new(ScriptedProvider::new(Vec::new())))
            .await
            .check_connection()
            .await
            .unwrap();
        assert!(healthy);
    }

    #[tokio::test]
    async fn reset_keeps_history() {
        let provider = Arc::new(ScriptedProvider::text(
            r#"{"knowledge_block": "- Gels", "summary": "Color gels"}"#,
        ));
        let engine = engine_with(provider).await;
        engine.ingest(pdf("gels.pdf")).await.unwrap();

        engine.reset_corpus().await;
        assert_eq!(engine.corpus().await, DEFAULT_CORPUS);
        assert_eq!(engine.version_history().await.len(), 1);
    }
}
