//! Risk report read model
//!
//! The assembled view returned by the synchronous analysis endpoint. It is
//! also the source of the snapshot forwarded to an AI summary job.

use crate::risk_analysis::domain::{
    MaintenanceStats, PackageSnapshot, SeverityCounts, SummaryPayload, VulnerabilityRecord,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Main read model for a package risk report
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskReport {
    pub package: PackageView,
    pub dependencies: DependencySummaryView,
    /// Findings, most severe first
    pub vulnerabilities: Vec<VulnerabilityRecord>,
    pub severity_counts: SeverityCounts,
    /// Batches whose lookup failed; findings for those packages are missing
    pub failed_batches: Vec<String>,
    /// True when some packages could not be checked
    pub partial: bool,
    pub staleness: StalenessView,
    pub generated_at: DateTime<Utc>,
}

/// View representation of the analyzed package
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageView {
    pub name: String,
    pub version: String,
    pub license: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub deprecated: Option<String>,
    pub maintenance: Option<MaintenanceStats>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencySummaryView {
    pub total: usize,
    pub direct: usize,
    pub transitive: usize,
    pub max_depth: usize,
    /// name -> exact version
    pub resolved: BTreeMap<String, String>,
    /// Direct dependencies no resolution tier could pin, as `name@range`
    pub skipped: Vec<String>,
}

/// Publish-age signals
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StalenessView {
    pub days_since_publish: Option<i64>,
    pub over_one_year: bool,
    pub over_two_years: bool,
}

impl RiskReport {
    /// Snapshot of this report in the shape the summary job expects
    pub fn summary_payload(&self) -> SummaryPayload {
        SummaryPayload {
            package: PackageSnapshot {
                name: self.package.name.clone(),
                version: self.package.version.clone(),
                license: self.package.license.clone(),
                dependencies: self.dependencies.resolved.clone(),
                direct_dependency_count: Some(self.dependencies.direct),
                published_at: self.package.published_at,
            },
            vulnerabilities: self.vulnerabilities.clone(),
        }
    }
}
