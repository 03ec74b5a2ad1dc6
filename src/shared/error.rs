use std::time::Duration;
use thiserror::Error;

/// Errors produced while acquiring and aggregating risk data.
///
/// Every variant carries a stable machine-readable code (see [`RiskError::code`])
/// so that callers can distinguish e.g. an invalid credential from a rate limit
/// while still showing the plain-language `Display` message to users.
#[derive(Debug, Clone, Error)]
pub enum RiskError {
    /// Malformed input or an upstream response with an unexpected shape
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Package not found: {package}")]
    NotFound { package: String },

    #[error("Network error while calling {target}: {details}")]
    Network { target: String, details: String },

    #[error("Request to {target} timed out after {timeout_ms} ms")]
    Timeout { target: String, timeout_ms: u64 },

    #[error("Rate limited by {target}{}", retry_after.map(|d| format!(" (retry after {}s)", d.as_secs())).unwrap_or_default())]
    RateLimited {
        target: String,
        retry_after: Option<Duration>,
    },

    #[error("{target} returned status code {status}: {message}")]
    Api {
        target: String,
        status: u16,
        message: String,
    },

    /// AI response was not valid JSON or failed schema checks
    #[error("Failed to parse AI response: {message}")]
    Parse { message: String },

    #[error("Job {job_id} has expired")]
    ExpiredJob { job_id: String },

    #[error("The AI provider rejected the API key\n\n💡 Hint: {hint}")]
    InvalidApiKey { hint: String },

    #[error("Failed to dispatch job: {reason}")]
    Dispatch { reason: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl RiskError {
    pub fn validation(message: impl Into<String>) -> Self {
        RiskError::Validation {
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        RiskError::Parse {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        RiskError::Internal {
            message: message.into(),
        }
    }

    /// Stable error code carried alongside user-facing messages
    pub fn code(&self) -> &'static str {
        match self {
            RiskError::Validation { .. } => "VALIDATION_ERROR",
            RiskError::NotFound { .. } => "NOT_FOUND",
            RiskError::Network { .. } => "NETWORK_ERROR",
            RiskError::Timeout { .. } => "TIMEOUT",
            RiskError::RateLimited { .. } => "RATE_LIMIT",
            RiskError::Api { .. } => "API_ERROR",
            RiskError::Parse { .. } => "PARSE_ERROR",
            RiskError::ExpiredJob { .. } => "EXPIRED",
            RiskError::InvalidApiKey { .. } => "INVALID_API_KEY",
            RiskError::Dispatch { .. } => "DISPATCH_FAILED",
            RiskError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Whether the retry primitive may attempt the request again
    pub fn is_retryable(&self) -> bool {
        match self {
            RiskError::Network { .. } | RiskError::Timeout { .. } => true,
            RiskError::RateLimited { .. } => true,
            RiskError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Plain-language message suitable for end users
    pub fn user_message(&self) -> String {
        match self {
            RiskError::Validation { message } => format!("The request was invalid: {}", message),
            RiskError::NotFound { package } => {
                format!("The package '{}' does not exist in the registry.", package)
            }
            RiskError::Network { .. } => {
                "A network error occurred while contacting an external service.".to_string()
            }
            RiskError::Timeout { .. } => "An external service took too long to respond.".to_string(),
            RiskError::RateLimited { .. } => {
                "An external service is rate limiting requests. Please try again later.".to_string()
            }
            RiskError::Api { status, .. } => {
                format!("An external service returned an error (status {}).", status)
            }
            RiskError::Parse { .. } => {
                "The AI summary could not be understood. Please try again.".to_string()
            }
            RiskError::ExpiredJob { .. } => {
                "This summary has expired. Please request a new one.".to_string()
            }
            RiskError::InvalidApiKey { .. } => {
                "The AI provider rejected the API key. Please check your credentials.".to_string()
            }
            RiskError::Dispatch { .. } => {
                "The summary job could not be started. Please try again.".to_string()
            }
            RiskError::Internal { .. } => "An unexpected internal error occurred.".to_string(),
        }
    }
}
