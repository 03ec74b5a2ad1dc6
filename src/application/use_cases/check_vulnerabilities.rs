use crate::ports::outbound::VulnerabilityRepository;
use crate::risk_analysis::domain::{ResolvedDependencySet, VulnerabilityReport};
use std::sync::Arc;
use tracing::{info, warn};

/// CheckVulnerabilitiesUseCase - Use case for checking vulnerabilities
///
/// Delegates the lookup to the VulnerabilityRepository and turns any
/// failure into a degraded report: a vulnerability lookup problem never
/// aborts the overall analysis.
///
/// # Type Parameters
/// * `R` - VulnerabilityRepository implementation
pub struct CheckVulnerabilitiesUseCase<R: VulnerabilityRepository> {
    vulnerability_repository: Arc<R>,
}

impl<R: VulnerabilityRepository> CheckVulnerabilitiesUseCase<R> {
    pub fn new(vulnerability_repository: Arc<R>) -> Self {
        Self {
            vulnerability_repository,
        }
    }

    /// Looks up advisories for the resolved dependency set
    ///
    /// # Returns
    /// The merged report. When the repository fails outright, the report is
    /// empty and names the failure in `failed_batches`.
    pub async fn execute(&self, dependencies: &ResolvedDependencySet) -> VulnerabilityReport {
        if dependencies.is_empty() {
            return VulnerabilityReport::default();
        }

        match self
            .vulnerability_repository
            .find_vulnerabilities(dependencies)
            .await
        {
            Ok(report) => {
                if report.is_partial() {
                    warn!(
                        failed_batches = report.failed_batches.len(),
                        findings = report.records.len(),
                        "Vulnerability lookup returned partial results"
                    );
                } else {
                    info!(
                        packages = dependencies.len(),
                        findings = report.records.len(),
                        "Vulnerability lookup finished"
                    );
                }
                report
            }
            Err(e) => {
                warn!(error = %e, code = e.code(), "Vulnerability lookup failed");
                VulnerabilityReport {
                    records: Vec::new(),
                    queried: dependencies.len(),
                    failed_batches: vec![format!("all packages: {}", e)],
                }
            }
        }
    }
}
