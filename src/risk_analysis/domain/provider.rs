use crate::shared::{RiskError, RiskResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OpenAI-compatible chat providers that can produce summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Groq,
    OpenRouter,
}

impl AiProvider {
    pub const ALL: [AiProvider; 2] = [AiProvider::Groq, AiProvider::OpenRouter];

    /// Infers the provider from a caller-supplied credential's prefix
    pub fn from_api_key(key: &str) -> Option<Self> {
        if key.starts_with("gsk_") {
            Some(AiProvider::Groq)
        } else if key.starts_with("sk-or-") {
            Some(AiProvider::OpenRouter)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AiProvider::Groq => "groq",
            AiProvider::OpenRouter => "openrouter",
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AiProvider {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(AiProvider::Groq),
            "openrouter" => Ok(AiProvider::OpenRouter),
            other => Err(RiskError::validation(format!(
                "Unknown AI provider '{}'. Expected one of: groq, openrouter",
                other
            ))),
        }
    }
}

/// Provider credential. Never serialized and redacted from debug output.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> RiskResult<Self> {
        let key = key.into().trim().to_string();
        if key.is_empty() {
            return Err(RiskError::validation("API key cannot be empty"));
        }
        Ok(Self(key))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ApiKey {
    type Error = RiskError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Model catalogue of one provider.
///
/// An empty `allowed_models` list means the catalogue is unrestricted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider: AiProvider,
    pub default_model: String,
    pub allowed_models: Vec<String>,
}

impl ProviderProfile {
    pub fn is_restricted(&self) -> bool {
        !self.allowed_models.is_empty()
    }

    /// Picks the requested model (or the default) and checks it against the allow-list
    pub fn select_model(&self, requested: Option<&str>) -> RiskResult<String> {
        let model = requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.default_model.as_str());

        if self.is_restricted() && !self.allowed_models.iter().any(|m| m == model) {
            return Err(RiskError::validation(format!(
                "Model '{}' is not available for provider {}. Allowed models: {}",
                model,
                self.provider,
                self.allowed_models.join(", ")
            )));
        }
        Ok(model.to_string())
    }
}
