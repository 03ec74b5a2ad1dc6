use crate::shared::RiskError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::warn;

/// Error body returned by every endpoint: `{error, errorCode}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
}

/// Wraps a RiskError so handlers can return it with `?`
#[derive(Debug)]
pub struct ApiError(pub RiskError);

impl From<RiskError> for ApiError {
    fn from(error: RiskError) -> Self {
        ApiError(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            RiskError::Validation { .. } => StatusCode::BAD_REQUEST,
            RiskError::NotFound { .. } => StatusCode::NOT_FOUND,
            RiskError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            RiskError::InvalidApiKey { .. } => StatusCode::UNAUTHORIZED,
            RiskError::ExpiredJob { .. } => StatusCode::GONE,
            RiskError::Network { .. }
            | RiskError::Timeout { .. }
            | RiskError::Api { .. }
            | RiskError::Parse { .. } => StatusCode::BAD_GATEWAY,
            RiskError::Dispatch { .. } | RiskError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self.0, code = self.0.code(), "Request failed");
        }

        let body = ErrorResponse {
            error: self.0.user_message(),
            error_code: self.0.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
