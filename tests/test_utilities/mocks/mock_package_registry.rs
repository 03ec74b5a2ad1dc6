use async_trait::async_trait;
use npm_risk_report::prelude::*;
use npm_risk_report::risk_analysis::domain::{ExactVersion, Packument, VersionManifest};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Mock PackageRegistry serving in-memory packuments
pub struct MockPackageRegistry {
    packuments: HashMap<String, Packument>,
    failing_metadata: HashSet<String>,
    pub metadata_requests: Mutex<Vec<String>>,
}

impl MockPackageRegistry {
    pub fn new() -> Self {
        Self {
            packuments: HashMap::new(),
            failing_metadata: HashSet::new(),
            metadata_requests: Mutex::new(Vec::new()),
        }
    }

    /// Registers a package; `versions` maps each version to its dependency ranges
    pub fn with_package(
        mut self,
        name: &str,
        latest: &str,
        versions: &[(&str, &[(&str, &str)])],
    ) -> Self {
        let versions = versions
            .iter()
            .map(|(version, deps)| {
                (
                    version.to_string(),
                    VersionManifest {
                        license: Some("MIT".to_string()),
                        dependencies: deps
                            .iter()
                            .map(|(dep, range)| (dep.to_string(), range.to_string()))
                            .collect(),
                        deprecated: None,
                    },
                )
            })
            .collect();
        let mut dist_tags = BTreeMap::new();
        dist_tags.insert("latest".to_string(), latest.to_string());

        self.packuments.insert(
            name.to_string(),
            Packument {
                name: PackageName::new(name).unwrap(),
                dist_tags,
                versions,
                time: BTreeMap::new(),
                maintainer_count: 1,
            },
        );
        self
    }

    /// Makes `fetch_metadata(name, Some(version))` fail with a network error
    pub fn with_failing_metadata(mut self, name: &str, version: &str) -> Self {
        self.failing_metadata.insert(format!("{}@{}", name, version));
        self
    }
}

impl Default for MockPackageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageRegistry for MockPackageRegistry {
    async fn fetch_packument(&self, name: &PackageName) -> RiskResult<Arc<Packument>> {
        self.packuments
            .get(name.as_str())
            .cloned()
            .map(Arc::new)
            .ok_or_else(|| RiskError::NotFound {
                package: name.to_string(),
            })
    }

    async fn fetch_metadata(
        &self,
        name: &PackageName,
        version: Option<&ExactVersion>,
    ) -> RiskResult<PackageMetadata> {
        let key = match version {
            Some(v) => format!("{}@{}", name, v),
            None => name.to_string(),
        };
        self.metadata_requests.lock().unwrap().push(key.clone());

        if self.failing_metadata.contains(&key) {
            return Err(RiskError::Network {
                target: "npm registry".to_string(),
                details: "connection reset by peer".to_string(),
            });
        }

        self.fetch_packument(name)
            .await?
            .metadata_for(version.map(ExactVersion::as_str))
    }
}
