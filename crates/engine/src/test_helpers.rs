//! Scripted provider shared by the engine's unit tests.

use std::sync::Mutex;

use promptmaster_core::error::ProviderError;
use promptmaster_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

/// A mock provider that returns scripted outcomes in sequence and records
/// every request it receives.
pub struct ScriptedProvider {
    outcomes: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    health: Mutex<Result<bool, ProviderError>>,
}

impl ScriptedProvider {
    pub fn new(outcomes: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            requests: Mutex::new(Vec::new()),
            health: Mutex::new(Ok(true)),
        }
    }

    /// Answer health checks with `health` instead of `Ok(true)`.
    pub fn with_health(self, health: Result<bool, ProviderError>) -> Self {
        *self.health.lock().unwrap() = health;
        self
    }

    pub fn text(text: &str) -> Self {
        Self::new(vec![Ok(Self::response(text))])
    }

    pub fn error(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn response(text: &str) -> ProviderResponse {
        ProviderResponse {
            text: text.into(),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock".into(),
            finish_reason: Some("STOP".into()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        let mut outcomes = self.outcomes.lock().unwrap();
        assert!(
            !outcomes.is_empty(),
            "ScriptedProvider exhausted at call #{call}"
        );
        outcomes.remove(0)
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        self.health.lock().unwrap().clone()
    }
}
