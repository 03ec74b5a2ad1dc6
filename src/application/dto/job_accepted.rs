use crate::risk_analysis::domain::JobId;
use serde::Serialize;

/// JobAccepted - Response DTO of a successful summary job submission
///
/// Serialized as `{"jobId": "...", "status": "pending"}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAccepted {
    pub job_id: JobId,
    pub status: &'static str,
}

impl JobAccepted {
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            status: "pending",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_wire_shape() {
        let id = JobId::generate();
        let json = serde_json::to_value(JobAccepted::new(id)).unwrap();
        assert_eq!(json["jobId"], id.to_string());
        assert_eq!(json["status"], "pending");
    }
}
