use super::models::ApiError;
use super::routes::AppState;
use crate::application::dto::JobAccepted;
use crate::application::read_models::RiskReport;
use crate::ports::inbound::{AnalyzeRequest, SummaryJobRequest};
use crate::risk_analysis::domain::JobState;
use crate::shared::RiskError;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::info;

/// Parses a JSON body so malformed payloads share the `{error, errorCode}` shape
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError(RiskError::validation(format!("invalid request body: {}", e))))
}

/// POST /api/analyze - Synchronous risk report for one package
pub async fn analyze_package(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RiskReport>, ApiError> {
    let request: AnalyzeRequest = parse_body(&body)?;
    let report = state.analysis.analyze(request).await?;
    Ok(Json(report))
}

/// POST /api/summary-jobs - Queue an AI summary, answers 202 with the job id
pub async fn submit_summary_job(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<JobAccepted>), ApiError> {
    let request: SummaryJobRequest = parse_body(&body)?;
    let job_id = state.jobs.submit(request).await?;
    info!(job_id = %job_id, "Summary job accepted");
    Ok((StatusCode::ACCEPTED, Json(JobAccepted::new(job_id))))
}

/// GET /api/summary-jobs/{id} - Current job state
pub async fn get_summary_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobState>, ApiError> {
    let job_state = state.jobs.poll(&id).await?;
    Ok(Json(job_state))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
