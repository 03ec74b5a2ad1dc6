use super::retry::HttpExecutor;
use crate::ports::outbound::{ChatRequest, SummaryProvider};
use crate::risk_analysis::domain::AiProvider;
use crate::shared::security::validate_https_base_url;
use crate::shared::{RiskError, RiskResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Streaming client for OpenAI-compatible chat completion endpoints
/// (Groq, OpenRouter).
///
/// Requests are sent with `stream: true` and the server-sent event chunks
/// are accumulated into a single string. Providers that ignore the stream
/// flag and answer with a plain completion object are handled as well.
pub struct OpenAiCompatibleClient {
    http: HttpExecutor,
    provider: AiProvider,
    base_url: String,
}

impl OpenAiCompatibleClient {
    pub fn new(http: HttpExecutor, provider: AiProvider, base_url: impl Into<String>) -> RiskResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        validate_https_base_url(&base_url, provider.as_str())?;
        Ok(Self {
            http,
            provider,
            base_url,
        })
    }

    pub fn default_base_url(provider: AiProvider) -> &'static str {
        match provider {
            AiProvider::Groq => "https://api.groq.com/openai/v1",
            AiProvider::OpenRouter => "https://openrouter.ai/api/v1",
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn to_wire_request(request: &ChatRequest) -> WireRequest<'_> {
        WireRequest {
            model: &request.model,
            messages: vec![
                WireMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                WireMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: true,
        }
    }
}

#[async_trait]
impl SummaryProvider for OpenAiCompatibleClient {
    fn provider(&self) -> AiProvider {
        self.provider
    }

    async fn complete(&self, request: &ChatRequest) -> RiskResult<String> {
        let url = self.chat_url();
        let body = Self::to_wire_request(request);
        let bearer = format!("Bearer {}", request.api_key.expose());

        debug!(provider = %self.provider, model = %request.model, "Starting streaming chat completion");

        let mut response = self
            .http
            .execute(self.provider.as_str(), |client| {
                client
                    .post(&url)
                    .header("Authorization", &bearer)
                    .header("Accept", "text/event-stream")
                    .json(&body)
            })
            .await
            .map_err(|e| match e {
                RiskError::Api {
                    status: 401 | 403,
                    ..
                } => RiskError::InvalidApiKey {
                    hint: format!(
                        "Check the {} API key passed with the request or set in the environment",
                        self.provider
                    ),
                },
                other => other,
            })?;

        let mut accumulator = StreamAccumulator::default();
        loop {
            let chunk = response.chunk().await.map_err(|e| RiskError::Network {
                target: self.provider.as_str().to_string(),
                details: format!("stream interrupted: {}", e),
            })?;
            match chunk {
                Some(bytes) => {
                    accumulator.push(&bytes)?;
                    if accumulator.is_done() {
                        break;
                    }
                }
                None => break,
            }
        }

        let content = accumulator.finish()?;
        debug!(provider = %self.provider, chars = content.len(), "Chat completion finished");
        Ok(content)
    }
}

/// Accumulates `data:` lines of an SSE chat completion stream
#[derive(Debug, Default)]
struct StreamAccumulator {
    pending: Vec<u8>,
    content: String,
    saw_event: bool,
    done: bool,
    /// Raw body kept in case the provider did not stream
    raw: Vec<u8>,
}

impl StreamAccumulator {
    fn push(&mut self, bytes: &[u8]) -> RiskResult<()> {
        self.raw.extend_from_slice(bytes);
        self.pending.extend_from_slice(bytes);

        while let Some(line_end) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&line);
            self.process_line(line.trim())?;
            if self.done {
                break;
            }
        }
        Ok(())
    }

    fn process_line(&mut self, line: &str) -> RiskResult<()> {
        let Some(data) = line.strip_prefix("data:") else {
            return Ok(());
        };
        let data = data.trim();
        self.saw_event = true;

        if data == "[DONE]" {
            self.done = true;
            return Ok(());
        }

        let chunk: StreamChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!(error = %e, "Skipping undecodable stream chunk");
                return Ok(());
            }
        };

        if let Some(error) = chunk.error {
            return Err(RiskError::Api {
                target: "AI provider".to_string(),
                status: 502,
                message: error.message.unwrap_or_else(|| "stream error".to_string()),
            });
        }

        if let Some(text) = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
        {
            self.content.push_str(&text);
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn finish(mut self) -> RiskResult<String> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            let rest = String::from_utf8_lossy(&rest).to_string();
            self.process_line(rest.trim())?;
        }

        if self.saw_event {
            return Ok(self.content);
        }

        // Non-streaming completion object
        let completion: Completion = serde_json::from_slice(&self.raw).map_err(|e| {
            RiskError::parse(format!("AI provider response is neither a stream nor a completion: {}", e))
        })?;
        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default())
    }
}

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::network::retry::RetryPolicy;
    use crate::risk_analysis::domain::ApiKey;
    use mockito::{Matcher, Server};
    use std::time::Duration;

    fn client(base_url: &str) -> OpenAiCompatibleClient {
        let http = HttpExecutor::new(RetryPolicy {
            max_attempts: 1,
            base_backoff: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        })
        .unwrap();
        OpenAiCompatibleClient::new(http, AiProvider::Groq, base_url).unwrap()
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "llama-3.3-70b-versatile".to_string(),
            system_prompt: "system".to_string(),
            user_prompt: "user".to_string(),
            temperature: 0.2,
            max_tokens: 100,
            api_key: ApiKey::new("gsk_test").unwrap(),
        }
    }

    #[test]
    fn test_accumulates_split_chunks() {
        let mut acc = StreamAccumulator::default();
        acc.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel").unwrap();
        acc.push(b"lo\"}}]}\n\ndata: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n")
            .unwrap();
        acc.push(b"data: [DONE]\n").unwrap();
        assert!(acc.is_done());
        assert_eq!(acc.finish().unwrap(), "Hello world");
    }

    #[test]
    fn test_ignores_comments_and_role_chunks() {
        let mut acc = StreamAccumulator::default();
        acc.push(b": OPENROUTER PROCESSING\n\n").unwrap();
        acc.push(b"data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n").unwrap();
        acc.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n").unwrap();
        assert_eq!(acc.finish().unwrap(), "ok");
    }

    #[test]
    fn test_non_streaming_completion_fallback() {
        let mut acc = StreamAccumulator::default();
        acc.push(br#"{"choices":[{"message":{"role":"assistant","content":"plain"}}]}"#)
            .unwrap();
        assert_eq!(acc.finish().unwrap(), "plain");
    }

    #[test]
    fn test_stream_error_event() {
        let mut acc = StreamAccumulator::default();
        let err = acc
            .push(b"data: {\"error\":{\"message\":\"overloaded\"}}\n")
            .unwrap_err();
        assert_eq!(err.code(), "API_ERROR");
    }

    #[tokio::test]
    async fn test_complete_streams_content() {
        let mut server = Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"{\\\"summary\\\":\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" \\\"ok\\\"}\"}}]}\n\n",
            "data: [DONE]\n\n"
        );
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer gsk_test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "llama-3.3-70b-versatile",
                "stream": true
            })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .expect(1)
            .create_async()
            .await;

        let content = client(&server.url()).complete(&request()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(content, "{\"summary\": \"ok\"}");
    }

    #[tokio::test]
    async fn test_rejected_key_is_invalid_api_key() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Invalid API Key"}}"#)
            .create_async()
            .await;

        let err = client(&server.url()).complete(&request()).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_API_KEY");
    }

    #[tokio::test]
    async fn test_rate_limit_is_reported() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .create_async()
            .await;

        let err = client(&server.url()).complete(&request()).await.unwrap_err();
        assert_eq!(err.code(), "RATE_LIMIT");
    }
}
