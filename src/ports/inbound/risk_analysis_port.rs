use crate::application::read_models::RiskReport;
use crate::shared::RiskResult;
use async_trait::async_trait;
use serde::Deserialize;

/// Request parameters for a synchronous package analysis
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub name: String,
    /// Exact version, range or dist-tag; `latest` when absent
    #[serde(default)]
    pub version: Option<String>,
}

impl AnalyzeRequest {
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

/// RiskAnalysisPort - Inbound port for the metadata, dependency and
/// vulnerability pipeline
#[async_trait]
pub trait RiskAnalysisPort: Send + Sync {
    /// Analyzes a package and assembles its risk report
    ///
    /// # Errors
    /// Fails if the root package metadata cannot be fetched. Failures of
    /// individual transitive dependencies or vulnerability batches degrade
    /// the report instead.
    async fn analyze(&self, request: AnalyzeRequest) -> RiskResult<RiskReport>;
}
