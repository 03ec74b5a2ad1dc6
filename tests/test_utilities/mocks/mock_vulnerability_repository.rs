use async_trait::async_trait;
use npm_risk_report::prelude::*;
use npm_risk_report::risk_analysis::domain::{ResolvedDependencySet, Severity};
use std::sync::Mutex;

/// Mock VulnerabilityRepository returning canned findings
pub struct MockVulnerabilityRepository {
    findings: Vec<VulnerabilityRecord>,
    should_fail: bool,
    pub queries: Mutex<Vec<(String, String)>>,
}

impl MockVulnerabilityRepository {
    pub fn new() -> Self {
        Self {
            findings: Vec::new(),
            should_fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn with_finding(mut self, package: &str, version: &str, id: &str, severity: Severity) -> Self {
        self.findings.push(VulnerabilityRecord {
            id: id.to_string(),
            package_name: package.to_string(),
            version: version.to_string(),
            severity,
            score: None,
            summary: Some(format!("Advisory {}", id)),
            aliases: Vec::new(),
            fixed_version: None,
        });
        self
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Self::new()
        }
    }

    pub fn queried(&self) -> Vec<(String, String)> {
        self.queries.lock().unwrap().clone()
    }
}

impl Default for MockVulnerabilityRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VulnerabilityRepository for MockVulnerabilityRepository {
    async fn find_vulnerabilities(
        &self,
        dependencies: &ResolvedDependencySet,
    ) -> RiskResult<VulnerabilityReport> {
        {
            let mut queries = self.queries.lock().unwrap();
            for (name, version) in dependencies.iter() {
                queries.push((name.to_string(), version.to_string()));
            }
        }

        if self.should_fail {
            return Err(RiskError::Timeout {
                target: "OSV".to_string(),
                timeout_ms: 10_000,
            });
        }

        let records = self
            .findings
            .iter()
            .filter(|f| {
                dependencies
                    .get(&f.package_name)
                    .is_some_and(|v| v.as_str() == f.version)
            })
            .cloned()
            .collect();

        Ok(VulnerabilityReport {
            records,
            queried: dependencies.len(),
            failed_batches: Vec::new(),
        })
    }
}
