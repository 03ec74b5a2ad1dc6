use crate::risk_analysis::domain::{most_severe, SeverityCounts, SummaryPayload};
use chrono::{DateTime, Utc};
use std::fmt::Write;

const STALE_AFTER_DAYS: i64 = 365;
const ABANDONED_AFTER_DAYS: i64 = 730;
const TOP_FINDINGS: usize = 5;

const SYSTEM_PROMPT: &str = "You are a senior application security analyst reviewing npm packages \
for supply-chain risk. Assess the package from the data provided: known vulnerabilities, \
dependency footprint, license and maintenance signals. Respond with a single JSON object and \
nothing else, using exactly these keys:\n\
{\n\
  \"summary\": string (2-4 sentences),\n\
  \"riskLevel\": \"low\" | \"medium\" | \"high\" | \"critical\",\n\
  \"keyRisks\": string[],\n\
  \"recommendations\": string[],\n\
  \"maintenanceStatus\": \"active\" | \"maintained\" | \"stale\" | \"abandoned\",\n\
  \"licenseCompatibility\": \"permissive\" | \"weak-copyleft\" | \"strong-copyleft\" | \"proprietary\" | \"unknown\"\n\
}";

/// Builds the chat prompts for an AI risk summary
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn system_prompt() -> &'static str {
        SYSTEM_PROMPT
    }

    pub fn user_prompt(payload: &SummaryPayload, now: DateTime<Utc>) -> String {
        let package = &payload.package;
        let total = package.dependencies.len();
        let direct = package.direct_dependency_count.unwrap_or(total).min(total);
        let counts = SeverityCounts::tally(&payload.vulnerabilities);

        let mut prompt = String::new();
        let _ = writeln!(prompt, "Package: {}@{}", package.name, package.version);
        let _ = writeln!(
            prompt,
            "License: {}",
            package.license.as_deref().unwrap_or("not declared")
        );
        let _ = writeln!(
            prompt,
            "Dependencies: {} total ({} direct, {} transitive)",
            total,
            direct,
            total - direct
        );
        let _ = writeln!(
            prompt,
            "Vulnerabilities: {} total (critical: {}, high: {}, medium: {}, low: {}, unknown: {})",
            counts.total(),
            counts.critical,
            counts.high,
            counts.medium,
            counts.low,
            counts.unknown
        );

        let top = most_severe(&payload.vulnerabilities, TOP_FINDINGS);
        if !top.is_empty() {
            let _ = writeln!(prompt, "\nMost severe findings:");
            for record in top {
                let _ = writeln!(
                    prompt,
                    "- [{}] {} in {}@{}: {}",
                    record.severity,
                    record.id,
                    record.package_name,
                    record.version,
                    record.summary.as_deref().unwrap_or("no summary available")
                );
            }
        }

        let _ = writeln!(prompt, "\nMaintenance:");
        match package.published_at.map(|published| (now - published).num_days()) {
            Some(days) => {
                let _ = writeln!(prompt, "- Days since last publish: {}", days);
                if days > ABANDONED_AFTER_DAYS {
                    let _ = writeln!(
                        prompt,
                        "- WARNING: no release in over two years, the package may be abandoned"
                    );
                } else if days > STALE_AFTER_DAYS {
                    let _ = writeln!(
                        prompt,
                        "- WARNING: no release in over a year, the package may be stale"
                    );
                }
            }
            None => {
                let _ = writeln!(prompt, "- Publish date unknown");
            }
        }

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk_analysis::domain::{PackageSnapshot, Severity, VulnerabilityRecord};
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn record(id: &str, severity: Severity) -> VulnerabilityRecord {
        VulnerabilityRecord {
            id: id.to_string(),
            package_name: "minimist".to_string(),
            version: "1.2.0".to_string(),
            severity,
            score: None,
            summary: Some(format!("{} summary", id)),
            aliases: vec![],
            fixed_version: None,
        }
    }

    fn payload(published_days_ago: Option<i64>, now: DateTime<Utc>) -> SummaryPayload {
        let mut dependencies = BTreeMap::new();
        dependencies.insert("minimist".to_string(), "1.2.0".to_string());
        dependencies.insert("mkdirp".to_string(), "0.5.1".to_string());
        dependencies.insert("ms".to_string(), "2.0.0".to_string());
        SummaryPayload {
            package: PackageSnapshot {
                name: "example".to_string(),
                version: "1.0.0".to_string(),
                license: Some("MIT".to_string()),
                dependencies,
                direct_dependency_count: Some(1),
                published_at: published_days_ago.map(|d| now - Duration::days(d)),
            },
            vulnerabilities: vec![
                record("LOW-1", Severity::Low),
                record("CRIT-1", Severity::Critical),
                record("MED-1", Severity::Medium),
                record("HIGH-1", Severity::High),
                record("HIGH-2", Severity::High),
                record("UNK-1", Severity::Unknown),
            ],
        }
    }

    #[test]
    fn test_system_prompt_defines_schema() {
        let system = PromptBuilder::system_prompt();
        assert!(system.contains("security analyst"));
        assert!(system.contains("riskLevel"));
        assert!(system.contains("licenseCompatibility"));
    }

    #[test]
    fn test_user_prompt_counts() {
        let now = Utc::now();
        let prompt = PromptBuilder::user_prompt(&payload(Some(10), now), now);
        assert!(prompt.contains("Package: example@1.0.0"));
        assert!(prompt.contains("License: MIT"));
        assert!(prompt.contains("3 total (1 direct, 2 transitive)"));
        assert!(prompt.contains("critical: 1, high: 2, medium: 1, low: 1, unknown: 1"));
    }

    #[test]
    fn test_user_prompt_lists_top_five_most_severe() {
        let now = Utc::now();
        let prompt = PromptBuilder::user_prompt(&payload(Some(10), now), now);
        let crit = prompt.find("CRIT-1").unwrap();
        let high = prompt.find("HIGH-1").unwrap();
        let low = prompt.find("LOW-1").unwrap();
        assert!(crit < high && high < low);
        assert!(!prompt.contains("UNK-1"));
    }

    #[test]
    fn test_staleness_warnings() {
        let now = Utc::now();
        let fresh = PromptBuilder::user_prompt(&payload(Some(30), now), now);
        assert!(!fresh.contains("WARNING"));

        let stale = PromptBuilder::user_prompt(&payload(Some(400), now), now);
        assert!(stale.contains("over a year"));

        let abandoned = PromptBuilder::user_prompt(&payload(Some(800), now), now);
        assert!(abandoned.contains("over two years"));

        let unknown = PromptBuilder::user_prompt(&payload(None, now), now);
        assert!(unknown.contains("Publish date unknown"));
    }
}
