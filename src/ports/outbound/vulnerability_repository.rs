use crate::risk_analysis::domain::{ResolvedDependencySet, VulnerabilityReport};
use crate::shared::RiskResult;
use async_trait::async_trait;

/// VulnerabilityRepository port for looking up known advisories
///
/// The input type only holds exact versions, so range syntax can never reach
/// the vulnerability database.
#[async_trait]
pub trait VulnerabilityRepository: Send + Sync {
    /// Looks up advisories for every resolved dependency.
    ///
    /// Partial failures (e.g. one failed batch) are reported through
    /// `VulnerabilityReport::failed_batches` rather than as an error.
    async fn find_vulnerabilities(
        &self,
        dependencies: &ResolvedDependencySet,
    ) -> RiskResult<VulnerabilityReport>;
}
