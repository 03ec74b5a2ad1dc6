use async_trait::async_trait;
use npm_risk_report::ports::outbound::ChatRequest;
use npm_risk_report::prelude::*;
use std::sync::Mutex;

/// Mock SummaryProvider replying with a fixed completion
pub struct MockSummaryProvider {
    provider: AiProvider,
    reply: RiskResult<String>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl MockSummaryProvider {
    pub fn replying(provider: AiProvider, reply: &str) -> Self {
        Self {
            provider,
            reply: Ok(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(provider: AiProvider, error: RiskError) -> Self {
        Self {
            provider,
            reply: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SummaryProvider for MockSummaryProvider {
    fn provider(&self) -> AiProvider {
        self.provider
    }

    async fn complete(&self, request: &ChatRequest) -> RiskResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone()
    }
}
