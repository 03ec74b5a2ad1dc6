use crate::risk_analysis::domain::{JobId, JobRecord};
use crate::shared::RiskResult;
use async_trait::async_trait;

/// JobStore port: key-value persistence for summary job records
///
/// Reads never apply the TTL; expiry is enforced by the reader. A store may
/// still collect long-expired records in the background.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get(&self, id: &JobId) -> RiskResult<Option<JobRecord>>;

    async fn put(&self, id: &JobId, record: &JobRecord) -> RiskResult<()>;

    async fn delete(&self, id: &JobId) -> RiskResult<()>;
}
