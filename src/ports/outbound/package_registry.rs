use crate::risk_analysis::domain::{ExactVersion, PackageMetadata, PackageName, Packument};
use crate::risk_analysis::services::RangeMatcher;
use crate::shared::RiskResult;
use async_trait::async_trait;
use std::sync::Arc;

/// PackageRegistry port for fetching package metadata
///
/// This port abstracts the package registry (e.g., registry.npmjs.org).
/// Implementations only have to provide `fetch_packument`; metadata lookup
/// and range resolution are derived from the packument by default.
///
/// # Async Support
/// Implementations must be `Send + Sync` so the resolver can fan out
/// concurrent lookups.
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Fetches the full registry document for a package.
    /// Packuments can be large, so they are handed out shared.
    ///
    /// # Errors
    /// - `NotFound` if the registry does not know the package
    /// - `Validation` if the response has an unexpected shape
    /// - transport errors once the retry budget is exhausted
    async fn fetch_packument(&self, name: &PackageName) -> RiskResult<Arc<Packument>>;

    /// Fetches metadata for one version, or for `latest` when `version` is `None`
    async fn fetch_metadata(
        &self,
        name: &PackageName,
        version: Option<&ExactVersion>,
    ) -> RiskResult<PackageMetadata> {
        let packument = self.fetch_packument(name).await?;
        packument.metadata_for(version.map(ExactVersion::as_str))
    }

    /// Resolves an npm range to the highest satisfying published version,
    /// falling back to `latest`
    async fn resolve_range(&self, name: &PackageName, range: &str) -> RiskResult<ExactVersion> {
        let packument = self.fetch_packument(name).await?;
        RangeMatcher::resolve(&packument, range)
    }
}
