pub mod catalog;
pub mod generate;
pub mod key;
pub mod knowledge;
pub mod learn;
pub mod onboard;
pub mod status;

use std::sync::Arc;

use promptmaster_config::AppConfig;
use promptmaster_engine::{EngineSettings, PromptEngine};
use promptmaster_knowledge::{FileStorage, KnowledgeStore};
use promptmaster_providers::GeminiProvider;
use tracing::debug;

/// Load the config and the persisted knowledge base.
pub async fn open_store() -> Result<(AppConfig, Arc<KnowledgeStore>), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let storage = Arc::new(FileStorage::new(config.data_dir()));
    debug!(data_dir = %storage.dir().display(), "Opening knowledge base");
    let store = Arc::new(KnowledgeStore::load(storage).await);
    Ok((config, store))
}

/// Build an engine over the persisted knowledge base and the Gemini API.
pub async fn open_engine() -> Result<(AppConfig, PromptEngine), Box<dyn std::error::Error>> {
    let (config, store) = open_store().await?;

    let (credential, source) = resolve_credential(&config, &store).await;
    debug!(source = source.describe(), "Resolved API key");

    let provider = GeminiProvider::from_config(&config, credential.clone().unwrap_or_default());
    let mut settings = EngineSettings::from_config(&config);
    settings.credential = credential;

    let engine = PromptEngine::new(Arc::new(provider), store, settings);
    Ok((config, engine))
}

/// Where the API key in use came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Config,
    Stored,
    Missing,
}

impl KeySource {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Config => "config.toml / environment",
            Self::Stored => "stored with `promptmaster key`",
            Self::Missing => "not set",
        }
    }
}

/// Config and environment take precedence over the stored key.
pub async fn resolve_credential(
    config: &AppConfig,
    store: &KnowledgeStore,
) -> (Option<String>, KeySource) {
    if config.has_api_key() {
        return (config.api_key.clone(), KeySource::Config);
    }
    match store.credential().await {
        Some(key) => (Some(key), KeySource::Stored),
        None => (None, KeySource::Missing),
    }
}

/// Print a warning when the last knowledge save did not reach disk.
pub fn report_persist_failure(store: &KnowledgeStore) {
    if store.last_persist_failed() {
        eprintln!("  ⚠️  Changes are active for this run but could not be saved to disk.");
    }
}
