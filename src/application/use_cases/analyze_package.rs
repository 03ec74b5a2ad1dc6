use super::{CheckVulnerabilitiesUseCase, ResolveDependenciesUseCase, ResolverOptions};
use crate::application::read_models::{RiskReport, RiskReportBuilder};
use crate::ports::inbound::{AnalyzeRequest, RiskAnalysisPort};
use crate::ports::outbound::{PackageRegistry, VulnerabilityRepository};
use crate::risk_analysis::domain::{ExactVersion, PackageMetadata, PackageName};
use crate::shared::security::validate_version_component;
use crate::shared::{Clock, RiskResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// AnalyzePackageUseCase - Core use case for a package risk report
///
/// Orchestrates the synchronous part of the pipeline:
/// root metadata, dependency resolution, vulnerability lookup and report
/// assembly. Only a failure to obtain the root package's metadata is fatal.
///
/// # Type Parameters
/// * `R` - PackageRegistry implementation
/// * `V` - VulnerabilityRepository implementation
pub struct AnalyzePackageUseCase<R: PackageRegistry, V: VulnerabilityRepository> {
    registry: Arc<R>,
    resolver: ResolveDependenciesUseCase<R>,
    vulnerabilities: CheckVulnerabilitiesUseCase<V>,
    clock: Arc<dyn Clock>,
}

impl<R: PackageRegistry, V: VulnerabilityRepository> AnalyzePackageUseCase<R, V> {
    pub fn new(
        registry: Arc<R>,
        vulnerability_repository: Arc<V>,
        options: ResolverOptions,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resolver: ResolveDependenciesUseCase::new(registry.clone(), options),
            vulnerabilities: CheckVulnerabilitiesUseCase::new(vulnerability_repository),
            registry,
            clock,
        }
    }

    /// Fetches root metadata. `requested` may be an exact version, a range
    /// or a dist-tag; absent means `latest`.
    async fn fetch_root(
        &self,
        name: &PackageName,
        requested: Option<&str>,
    ) -> RiskResult<PackageMetadata> {
        let requested = requested.map(str::trim).filter(|v| !v.is_empty());
        let Some(requested) = requested else {
            return self.registry.fetch_metadata(name, None).await;
        };

        validate_version_component(requested)?;
        let version = match ExactVersion::new(requested) {
            Ok(exact) => exact,
            Err(_) => self.registry.resolve_range(name, requested).await?,
        };
        self.registry.fetch_metadata(name, Some(&version)).await
    }
}

#[async_trait]
impl<R, V> RiskAnalysisPort for AnalyzePackageUseCase<R, V>
where
    R: PackageRegistry + 'static,
    V: VulnerabilityRepository + 'static,
{
    async fn analyze(&self, request: AnalyzeRequest) -> RiskResult<RiskReport> {
        let name = PackageName::new(request.name.trim())?;

        // Step 1: Root metadata (fatal on failure)
        let metadata = self.fetch_root(&name, request.version.as_deref()).await?;
        info!(package = %metadata.name, version = %metadata.version, "Analyzing package");

        // Step 2: Resolve the dependency graph to exact versions
        let graph = self.resolver.execute(&metadata).await;

        // Step 3: Vulnerability lookup (degrades instead of failing)
        let vulnerabilities = self.vulnerabilities.execute(&graph.resolved).await;

        // Step 4: Assemble the report
        Ok(RiskReportBuilder::build(
            &metadata,
            &graph,
            &vulnerabilities,
            self.clock.now(),
        ))
    }
}
