use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized severity classification.
///
/// Variants are declared from least to most severe so that the derived
/// ordering sorts `Critical` highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Unknown => "UNKNOWN",
        };
        write!(f, "{}", label)
    }
}

/// A known advisory affecting one resolved package version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilityRecord {
    pub id: String,
    pub package_name: String,
    pub version: String,
    pub severity: Severity,
    /// Numeric score the severity was derived from, when one was available
    pub score: Option<f32>,
    pub summary: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub fixed_version: Option<String>,
}

/// Per-level tally of findings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeverityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub unknown: usize,
}

impl SeverityCounts {
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a VulnerabilityRecord>) -> Self {
        let mut counts = Self::default();
        for record in records {
            match record.severity {
                Severity::Critical => counts.critical += 1,
                Severity::High => counts.high += 1,
                Severity::Medium => counts.medium += 1,
                Severity::Low => counts.low += 1,
                Severity::Unknown => counts.unknown += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low + self.unknown
    }
}

/// Output of a vulnerability lookup across a resolved dependency set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilityReport {
    pub records: Vec<VulnerabilityRecord>,
    /// Number of packages queried
    pub queried: usize,
    /// Human-readable descriptions of batches that failed
    pub failed_batches: Vec<String>,
}

/// Orders findings by severity, then score, then id; keeps the first `limit`
pub fn most_severe(records: &[VulnerabilityRecord], limit: usize) -> Vec<&VulnerabilityRecord> {
    let mut sorted: Vec<&VulnerabilityRecord> = records.iter().collect();
    sorted.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| {
                b.score
                    .unwrap_or(0.0)
                    .partial_cmp(&a.score.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.id.cmp(&b.id))
    });
    sorted.truncate(limit);
    sorted
}

impl VulnerabilityReport {
    pub fn counts(&self) -> SeverityCounts {
        SeverityCounts::tally(&self.records)
    }

    /// Findings sorted most severe first, truncated to `limit`
    pub fn most_severe(&self, limit: usize) -> Vec<&VulnerabilityRecord> {
        most_severe(&self.records, limit)
    }

    pub fn is_partial(&self) -> bool {
        !self.failed_batches.is_empty()
    }
}
