use super::{AiProvider, ApiKey, VulnerabilityRecord};
use crate::shared::{RiskError, RiskResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Identifier of an AI summary job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a caller-supplied id; anything that is not a UUID is rejected
    pub fn parse(raw: &str) -> RiskResult<Self> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| RiskError::validation(format!("'{}' is not a valid job id", raw)))
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaintenanceStatus {
    Active,
    Maintained,
    Stale,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LicenseCompatibility {
    Permissive,
    WeakCopyleft,
    StrongCopyleft,
    Proprietary,
    Unknown,
}

/// Structured AI narrative. Every field is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSummary {
    pub summary: String,
    pub risk_level: RiskLevel,
    pub key_risks: Vec<String>,
    pub recommendations: Vec<String>,
    pub maintenance_status: MaintenanceStatus,
    pub license_compatibility: LicenseCompatibility,
}

/// Package identity and signals forwarded to the summary job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSnapshot {
    pub name: String,
    pub version: String,
    pub license: Option<String>,
    /// Resolved dependencies: name -> exact version
    pub dependencies: BTreeMap<String, String>,
    pub direct_dependency_count: Option<usize>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Everything the worker needs to produce a summary, captured at submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryPayload {
    pub package: PackageSnapshot,
    pub vulnerabilities: Vec<VulnerabilityRecord>,
}

/// Job lifecycle. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Completed {
        result: AiSummary,
    },
    Failed {
        error: String,
        #[serde(rename = "errorCode")]
        error_code: String,
    },
}

impl JobState {
    pub fn failed(error: &RiskError) -> Self {
        JobState::Failed {
            error: error.user_message(),
            error_code: error.code().to_string(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Pending)
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
        }
    }
}

/// Persisted job record: `{status, result|error, timestamp, expiresAt}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    #[serde(flatten)]
    pub state: JobState,
    pub timestamp: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// A unit of asynchronous summary work, as handed to the worker pool
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub id: JobId,
    pub payload: SummaryPayload,
    pub provider: AiProvider,
    pub model: String,
    pub api_key: ApiKey,
    pub created_at: DateTime<Utc>,
    /// Submission time plus the job TTL; terminal records inherit it
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_summary() -> AiSummary {
        AiSummary {
            summary: "Low risk utility library".to_string(),
            risk_level: RiskLevel::Low,
            key_risks: vec![],
            recommendations: vec!["Keep up to date".to_string()],
            maintenance_status: MaintenanceStatus::Active,
            license_compatibility: LicenseCompatibility::Permissive,
        }
    }

    #[test]
    fn test_job_id_parse_rejects_non_uuid() {
        assert!(JobId::parse("not-a-uuid").is_err());
        assert!(JobId::parse("../../etc").is_err());
        let id = JobId::generate();
        assert_eq!(JobId::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_completed_record_wire_format() {
        let now = Utc::now();
        let record = JobRecord {
            state: JobState::Completed {
                result: sample_summary(),
            },
            timestamp: now,
            expires_at: now + Duration::seconds(3600),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["result"]["riskLevel"], "low");
        assert_eq!(value["result"]["licenseCompatibility"], "permissive");
        assert!(value.get("expiresAt").is_some());

        let back: JobRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_failed_record_wire_format() {
        let now = Utc::now();
        let record = JobRecord {
            state: JobState::failed(&RiskError::parse("not json")),
            timestamp: now,
            expires_at: now,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["errorCode"], "PARSE_ERROR");
        assert!(value["error"].as_str().is_some());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Pending.is_terminal());
        assert!(JobState::Completed {
            result: sample_summary()
        }
        .is_terminal());
        assert!(JobState::failed(&RiskError::internal("boom")).is_terminal());
    }

    #[test]
    fn test_record_expiry() {
        let now = Utc::now();
        let record = JobRecord {
            state: JobState::Pending,
            timestamp: now,
            expires_at: now + Duration::seconds(3600),
        };
        assert!(!record.is_expired(now + Duration::seconds(3600)));
        assert!(record.is_expired(now + Duration::seconds(3601)));
    }

    #[test]
    fn test_closed_enums_reject_unknown_values() {
        let json = r#"{
            "summary": "x",
            "riskLevel": "extreme",
            "keyRisks": [],
            "recommendations": [],
            "maintenanceStatus": "active",
            "licenseCompatibility": "permissive"
        }"#;
        assert!(serde_json::from_str::<AiSummary>(json).is_err());
    }
}
