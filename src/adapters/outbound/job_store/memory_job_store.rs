use crate::ports::outbound::JobStore;
use crate::risk_analysis::domain::{JobId, JobRecord};
use crate::shared::{Clock, RiskError, RiskResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

struct StoredRecord {
    raw: String,
    expires_at: DateTime<Utc>,
}

/// InMemoryJobStore keeps job records as serialized JSON blobs.
///
/// Records are stored in their wire form (`{status, result|error, timestamp,
/// expiresAt}`) so that a persistent key-value store can replace this adapter
/// without changing the orchestrator. Reads never apply the TTL; expired
/// records are only collected by [`InMemoryJobStore::sweep_expired`].
#[derive(Clone, Default)]
pub struct InMemoryJobStore {
    records: Arc<DashMap<JobId, StoredRecord>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Raw stored JSON, for inspection
    pub fn raw(&self, id: &JobId) -> Option<String> {
        self.records.get(id).map(|entry| entry.value().raw.clone())
    }

    /// Drops every record whose `expiresAt` is before `cutoff`.
    /// Returns the number of records removed.
    pub fn sweep_expired(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| record.expires_at >= cutoff);
        before.saturating_sub(self.records.len())
    }

    /// Spawns a background task that sweeps the store every `every`.
    ///
    /// A record is kept for one extra interval past its expiry so that a
    /// poller still gets a chance to observe the expiration.
    pub fn spawn_sweeper(&self, clock: Arc<dyn Clock>, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        let grace = chrono::Duration::from_std(every).unwrap_or_else(|_| chrono::Duration::zero());
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = store.sweep_expired(clock.now() - grace);
                if removed > 0 {
                    debug!(removed, remaining = store.len(), "Swept expired job records");
                }
            }
        })
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn get(&self, id: &JobId) -> RiskResult<Option<JobRecord>> {
        let Some(raw) = self.raw(id) else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| RiskError::internal(format!("Corrupt job record {}: {}", id, e)))
    }

    async fn put(&self, id: &JobId, record: &JobRecord) -> RiskResult<()> {
        let raw = serde_json::to_string(record)
            .map_err(|e| RiskError::internal(format!("Failed to serialize job {}: {}", id, e)))?;
        self.records.insert(
            *id,
            StoredRecord {
                raw,
                expires_at: record.expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, id: &JobId) -> RiskResult<()> {
        self.records.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk_analysis::domain::JobState;
    use crate::shared::ManualClock;
    use chrono::{Duration, Utc};

    fn pending_record() -> JobRecord {
        let now = Utc::now();
        JobRecord {
            state: JobState::Pending,
            timestamp: now,
            expires_at: now + Duration::seconds(3600),
        }
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = InMemoryJobStore::new();
        let id = JobId::generate();
        assert!(store.get(&id).await.unwrap().is_none());

        let record = pending_record();
        store.put(&id, &record).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap(), Some(record));

        store.delete(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_records_are_stored_as_wire_json() {
        let store = InMemoryJobStore::new();
        let id = JobId::generate();
        store.put(&id, &pending_record()).await.unwrap();

        let raw: serde_json::Value = serde_json::from_str(&store.raw(&id).unwrap()).unwrap();
        assert_eq!(raw["status"], "pending");
        assert!(raw.get("timestamp").is_some());
        assert!(raw.get("expiresAt").is_some());
    }

    #[tokio::test]
    async fn test_store_does_not_expire_records() {
        let store = InMemoryJobStore::new();
        let id = JobId::generate();
        let now = Utc::now();
        let stale = JobRecord {
            state: JobState::Pending,
            timestamp: now - Duration::days(2),
            expires_at: now - Duration::days(1),
        };
        store.put(&id, &stale).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap(), Some(stale));
    }

    fn record_expiring_at(expires_at: DateTime<Utc>) -> JobRecord {
        JobRecord {
            state: JobState::Pending,
            timestamp: expires_at - Duration::seconds(3600),
            expires_at,
        }
    }

    #[tokio::test]
    async fn test_sweep_drops_unpolled_expired_records() {
        let clock = ManualClock::default();
        let store = InMemoryJobStore::new();
        let abandoned = JobId::generate();
        let live = JobId::generate();
        store
            .put(&abandoned, &record_expiring_at(clock.now() + Duration::seconds(60)))
            .await
            .unwrap();
        store
            .put(&live, &record_expiring_at(clock.now() + Duration::seconds(7200)))
            .await
            .unwrap();

        assert_eq!(store.sweep_expired(clock.now()), 0);
        assert_eq!(store.len(), 2);

        clock.advance(Duration::seconds(61));
        assert_eq!(store.sweep_expired(clock.now()), 1);
        assert!(store.get(&abandoned).await.unwrap().is_none());
        assert!(store.get(&live).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweeper_task_collects_expired_records() {
        let clock = ManualClock::default();
        let store = InMemoryJobStore::new();
        let id = JobId::generate();
        store
            .put(&id, &record_expiring_at(clock.now() - Duration::hours(1)))
            .await
            .unwrap();

        let handle = store.spawn_sweeper(Arc::new(clock.clone()), std::time::Duration::from_millis(5));
        for _ in 0..200 {
            if store.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        handle.abort();

        assert!(store.is_empty());
    }
}
