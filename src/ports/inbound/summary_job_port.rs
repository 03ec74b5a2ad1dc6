use crate::risk_analysis::domain::{
    ApiKey, JobId, JobState, PackageSnapshot, VulnerabilityRecord,
};
use crate::shared::RiskResult;
use async_trait::async_trait;
use serde::Deserialize;

/// Request parameters for an AI summary job
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryJobRequest {
    pub package: PackageSnapshot,
    #[serde(default)]
    pub vulnerabilities: Vec<VulnerabilityRecord>,
    /// Requested model; the provider default when absent
    #[serde(default)]
    pub model: Option<String>,
    /// Caller-supplied credential; the environment credential when absent
    #[serde(default)]
    pub api_key: Option<ApiKey>,
}

/// SummaryJobPort - Inbound port for asynchronous AI summaries
///
/// `submit` returns as soon as the job is recorded and queued; `poll` is
/// O(1) against the job store and never waits for the worker.
#[async_trait]
pub trait SummaryJobPort: Send + Sync {
    /// Validates the request, records a `pending` job and dispatches it
    ///
    /// # Errors
    /// Returns a validation error for malformed payloads, unknown models or a
    /// missing credential. A dispatch failure is not an error here: the job
    /// is recorded as `failed` and its id is still returned.
    async fn submit(&self, request: SummaryJobRequest) -> RiskResult<JobId>;

    /// Reports the current state of a job
    ///
    /// # Errors
    /// Returns a validation error if `job_id` is not a UUID
    async fn poll(&self, job_id: &str) -> RiskResult<JobState>;
}
