use crate::risk_analysis::domain::{AiProvider, ApiKey};
use crate::shared::RiskResult;
use async_trait::async_trait;

/// A single chat-completion request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub api_key: ApiKey,
}

/// SummaryProvider port for an OpenAI-compatible chat endpoint
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    fn provider(&self) -> AiProvider;

    /// Sends the request and returns the complete (accumulated) response text
    ///
    /// # Errors
    /// - `InvalidApiKey` when the provider rejects the credential
    /// - `RateLimited` when the provider keeps answering 429
    /// - `Api`/`Network`/`Timeout` for other failures
    async fn complete(&self, request: &ChatRequest) -> RiskResult<String>;
}
