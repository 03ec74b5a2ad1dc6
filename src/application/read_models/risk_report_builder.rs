//! Builder for constructing RiskReport from domain objects

use super::risk_report::{DependencySummaryView, PackageView, RiskReport, StalenessView};
use crate::risk_analysis::domain::{DependencyGraph, PackageMetadata, VulnerabilityReport};
use chrono::{DateTime, Utc};

const ONE_YEAR_DAYS: i64 = 365;
const TWO_YEARS_DAYS: i64 = 730;

/// Builder for constructing RiskReport from domain objects
pub struct RiskReportBuilder;

impl RiskReportBuilder {
    /// Builds the report
    ///
    /// # Arguments
    /// * `metadata` - Root package metadata
    /// * `graph` - Resolver output
    /// * `vulnerabilities` - Merged vulnerability lookup result
    /// * `now` - Reference instant for staleness
    pub fn build(
        metadata: &PackageMetadata,
        graph: &DependencyGraph,
        vulnerabilities: &VulnerabilityReport,
        now: DateTime<Utc>,
    ) -> RiskReport {
        let sorted = vulnerabilities
            .most_severe(vulnerabilities.records.len())
            .into_iter()
            .cloned()
            .collect();

        RiskReport {
            package: Self::build_package(metadata),
            dependencies: Self::build_dependencies(graph),
            vulnerabilities: sorted,
            severity_counts: vulnerabilities.counts(),
            failed_batches: vulnerabilities.failed_batches.clone(),
            partial: vulnerabilities.is_partial(),
            staleness: Self::build_staleness(metadata.days_since_publish(now)),
            generated_at: now,
        }
    }

    fn build_package(metadata: &PackageMetadata) -> PackageView {
        PackageView {
            name: metadata.name.to_string(),
            version: metadata.version.to_string(),
            license: metadata.license.clone(),
            published_at: metadata.published_at,
            deprecated: metadata.deprecated.clone(),
            maintenance: metadata.maintenance.clone(),
        }
    }

    fn build_dependencies(graph: &DependencyGraph) -> DependencySummaryView {
        DependencySummaryView {
            total: graph.total_package_count(),
            direct: graph.direct_dependency_count(),
            transitive: graph.transitive_dependency_count(),
            max_depth: graph.max_depth(),
            resolved: graph
                .resolved
                .iter()
                .map(|(name, version)| (name.to_string(), version.to_string()))
                .collect(),
            skipped: graph.skipped.clone(),
        }
    }

    fn build_staleness(days: Option<i64>) -> StalenessView {
        StalenessView {
            days_since_publish: days,
            over_one_year: days.is_some_and(|d| d > ONE_YEAR_DAYS),
            over_two_years: days.is_some_and(|d| d > TWO_YEARS_DAYS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk_analysis::domain::{
        ExactVersion, PackageName, Severity, VulnerabilityRecord,
    };
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn metadata(published_days_ago: Option<i64>, now: DateTime<Utc>) -> PackageMetadata {
        PackageMetadata {
            name: PackageName::new("request").unwrap(),
            version: ExactVersion::new("2.88.2").unwrap(),
            license: Some("Apache-2.0".to_string()),
            dependencies: BTreeMap::new(),
            published_at: published_days_ago.map(|d| now - Duration::days(d)),
            deprecated: Some("request has been deprecated".to_string()),
            maintenance: None,
        }
    }

    fn record(id: &str, severity: Severity) -> VulnerabilityRecord {
        VulnerabilityRecord {
            id: id.to_string(),
            package_name: "tough-cookie".to_string(),
            version: "2.5.0".to_string(),
            severity,
            score: None,
            summary: None,
            aliases: Vec::new(),
            fixed_version: None,
        }
    }

    fn graph() -> DependencyGraph {
        let mut graph = DependencyGraph::default();
        graph.resolved.insert_if_absent(
            PackageName::new("tough-cookie").unwrap(),
            ExactVersion::new("2.5.0").unwrap(),
        );
        graph.direct.push(PackageName::new("tough-cookie").unwrap());
        graph.skipped.push("gone@^1.0.0".to_string());
        graph
    }

    #[test]
    fn test_build_sorts_and_counts_findings() {
        let now = Utc::now();
        let vulnerabilities = VulnerabilityReport {
            records: vec![record("LOW-1", Severity::Low), record("CRIT-1", Severity::Critical)],
            queried: 1,
            failed_batches: Vec::new(),
        };

        let report = RiskReportBuilder::build(&metadata(Some(10), now), &graph(), &vulnerabilities, now);

        assert_eq!(report.vulnerabilities[0].id, "CRIT-1");
        assert_eq!(report.severity_counts.critical, 1);
        assert_eq!(report.severity_counts.low, 1);
        assert_eq!(report.dependencies.resolved["tough-cookie"], "2.5.0");
        assert_eq!(report.dependencies.skipped, vec!["gone@^1.0.0".to_string()]);
        assert!(!report.partial);
    }

    #[test]
    fn test_staleness_thresholds() {
        let now = Utc::now();
        let empty = VulnerabilityReport::default();

        let fresh = RiskReportBuilder::build(&metadata(Some(30), now), &graph(), &empty, now);
        assert!(!fresh.staleness.over_one_year);

        let stale = RiskReportBuilder::build(&metadata(Some(400), now), &graph(), &empty, now);
        assert!(stale.staleness.over_one_year);
        assert!(!stale.staleness.over_two_years);

        let abandoned = RiskReportBuilder::build(&metadata(Some(800), now), &graph(), &empty, now);
        assert!(abandoned.staleness.over_two_years);

        let unknown = RiskReportBuilder::build(&metadata(None, now), &graph(), &empty, now);
        assert_eq!(unknown.staleness.days_since_publish, None);
    }

    #[test]
    fn test_summary_payload_carries_resolved_versions() {
        let now = Utc::now();
        let vulnerabilities = VulnerabilityReport {
            records: vec![record("GHSA-1", Severity::High)],
            queried: 1,
            failed_batches: vec!["batch 1/1".to_string()],
        };
        let report = RiskReportBuilder::build(&metadata(Some(1), now), &graph(), &vulnerabilities, now);
        assert!(report.partial);

        let payload = report.summary_payload();
        assert_eq!(payload.package.name, "request");
        assert_eq!(payload.package.dependencies["tough-cookie"], "2.5.0");
        assert_eq!(payload.package.direct_dependency_count, Some(1));
        assert_eq!(payload.vulnerabilities.len(), 1);
    }
}
