use crate::adapters::outbound::cache::ResultCache;
use crate::ports::outbound::PackageRegistry;
use crate::risk_analysis::domain::{ExactVersion, PackageMetadata, PackageName, Packument};
use crate::shared::RiskResult;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// CachingPackageRegistry wraps a PackageRegistry and adds TTL caching.
///
/// This adapter implements the decorator pattern on top of the shared
/// `ResultCache`. Packuments are cached as shared values under
/// `npm-packument:{name}`, so a hit costs a reference count bump. Version
/// metadata is cached under `npm:{name}@{version}` (or `npm:{name}` for latest).
///
/// # Architecture
/// Caching is an implementation detail of the adapter layer; the resolver
/// only sees the `PackageRegistry` port.
pub struct CachingPackageRegistry<R: PackageRegistry> {
    inner: R,
    cache: ResultCache,
}

impl<R: PackageRegistry> CachingPackageRegistry<R> {
    pub fn new(inner: R, cache: ResultCache) -> Self {
        Self { inner, cache }
    }

    fn packument_key(name: &PackageName) -> String {
        format!("npm-packument:{}", name)
    }

    fn metadata_key(name: &PackageName, version: Option<&ExactVersion>) -> String {
        match version {
            Some(version) => format!("npm:{}@{}", name, version),
            None => format!("npm:{}", name),
        }
    }
}

#[async_trait]
impl<R: PackageRegistry> PackageRegistry for CachingPackageRegistry<R> {
    async fn fetch_packument(&self, name: &PackageName) -> RiskResult<Arc<Packument>> {
        let key = Self::packument_key(name);
        if let Some(cached) = self.cache.get_shared::<Packument>(&key) {
            debug!(key = %key, "Cache hit");
            return Ok(cached);
        }

        let packument = self.inner.fetch_packument(name).await?;
        self.cache.set_shared(key, packument.clone());
        Ok(packument)
    }

    async fn fetch_metadata(
        &self,
        name: &PackageName,
        version: Option<&ExactVersion>,
    ) -> RiskResult<PackageMetadata> {
        let key = Self::metadata_key(name, version);
        if let Some(cached) = self.cache.get_as::<PackageMetadata>(&key) {
            debug!(key = %key, "Cache hit");
            return Ok(cached);
        }

        let packument = self.fetch_packument(name).await?;
        let metadata = packument.metadata_for(version.map(ExactVersion::as_str))?;
        self.cache.set_as(key, &metadata);
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk_analysis::domain::VersionManifest;
    use crate::shared::ManualClock;
    use chrono::Duration;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock registry that tracks call counts
    struct CountingRegistry {
        calls: AtomicUsize,
    }

    impl CountingRegistry {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PackageRegistry for CountingRegistry {
        async fn fetch_packument(&self, name: &PackageName) -> RiskResult<Arc<Packument>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut versions = BTreeMap::new();
            versions.insert("1.0.0".to_string(), VersionManifest::default());
            versions.insert("1.1.0".to_string(), VersionManifest::default());
            let mut dist_tags = BTreeMap::new();
            dist_tags.insert("latest".to_string(), "1.1.0".to_string());
            Ok(Arc::new(Packument {
                name: name.clone(),
                dist_tags,
                versions,
                time: BTreeMap::new(),
                maintainer_count: 1,
            }))
        }
    }

    fn setup() -> (CachingPackageRegistry<CountingRegistry>, ManualClock) {
        let clock = ManualClock::default();
        let cache = ResultCache::with_default_ttl(Arc::new(clock.clone()));
        (CachingPackageRegistry::new(CountingRegistry::new(), cache), clock)
    }

    #[tokio::test]
    async fn test_packument_fetched_once_within_ttl() {
        let (registry, _clock) = setup();
        let name = PackageName::new("left-pad").unwrap();

        registry.fetch_packument(&name).await.unwrap();
        registry.fetch_metadata(&name, None).await.unwrap();
        registry.resolve_range(&name, "^1.0.0").await.unwrap();

        assert_eq!(registry.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_shares_the_stored_packument() {
        let (registry, _clock) = setup();
        let name = PackageName::new("left-pad").unwrap();

        let first = registry.fetch_packument(&name).await.unwrap();
        let second = registry.fetch_packument(&name).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_refetches_after_ttl() {
        let (registry, clock) = setup();
        let name = PackageName::new("left-pad").unwrap();

        registry.fetch_packument(&name).await.unwrap();
        clock.advance(Duration::seconds(3601));
        registry.fetch_packument(&name).await.unwrap();

        assert_eq!(registry.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_metadata_cache_keys() {
        let (registry, _clock) = setup();
        let name = PackageName::new("left-pad").unwrap();
        let v100 = ExactVersion::new("1.0.0").unwrap();

        let latest = registry.fetch_metadata(&name, None).await.unwrap();
        let pinned = registry.fetch_metadata(&name, Some(&v100)).await.unwrap();

        assert_eq!(latest.version.as_str(), "1.1.0");
        assert_eq!(pinned.version.as_str(), "1.0.0");
        assert!(registry.cache.has("npm:left-pad"));
        assert!(registry.cache.has("npm:left-pad@1.0.0"));
        assert!(registry.cache.has("npm-packument:left-pad"));
    }
}
