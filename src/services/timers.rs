use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::redis::RedisHandle;

const TIMER_PREFIX: &str = "timer:";

/// Deadline of one time-bound attempt. `end_time` is Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TimerRecord {
    pub(crate) attempt_id: String,
    pub(crate) paper_id: String,
    pub(crate) student_id: String,
    pub(crate) end_time: i64,
}

impl TimerRecord {
    pub(crate) fn remaining_seconds(&self, now_ms: i64) -> i64 {
        ((self.end_time - now_ms) / 1000).max(0)
    }

    pub(crate) fn is_expired(&self, now_ms: i64) -> bool {
        self.end_time <= now_ms
    }
}

pub(crate) fn timer_key(attempt_id: &str) -> String {
    format!("{TIMER_PREFIX}{attempt_id}")
}

/// Expiring deadline store. A missing record means "no active deadline".
#[async_trait]
pub(crate) trait TimerStore: Send + Sync {
    async fn set_with_ttl(&self, record: &TimerRecord, ttl_seconds: u64) -> Result<()>;

    async fn get(&self, attempt_id: &str) -> Result<Option<TimerRecord>>;

    async fn delete(&self, attempt_id: &str) -> Result<()>;

    /// Records whose deadline is at or before `now_ms`.
    async fn list_expired(&self, now_ms: i64) -> Result<Vec<TimerRecord>>;
}

/// Redis-backed timers. Keys outlive the deadline by `grace_seconds` so the
/// sweep still sees them after expiry.
#[derive(Clone)]
pub(crate) struct RedisTimerStore {
    redis: RedisHandle,
    grace_seconds: u64,
}

impl RedisTimerStore {
    pub(crate) fn new(redis: RedisHandle, grace_seconds: u64) -> Self {
        Self { redis, grace_seconds }
    }
}

#[async_trait]
impl TimerStore for RedisTimerStore {
    async fn set_with_ttl(&self, record: &TimerRecord, ttl_seconds: u64) -> Result<()> {
        let value = serde_json::to_string(record).context("Failed to encode timer record")?;
        self.redis
            .set_ex(&timer_key(&record.attempt_id), &value, ttl_seconds + self.grace_seconds)
            .await
            .context("Failed to store timer")?;
        Ok(())
    }

    async fn get(&self, attempt_id: &str) -> Result<Option<TimerRecord>> {
        let raw = self.redis.get(&timer_key(attempt_id)).await.context("Failed to read timer")?;
        raw.map(|value| serde_json::from_str(&value).context("Failed to decode timer record"))
            .transpose()
    }

    async fn delete(&self, attempt_id: &str) -> Result<()> {
        self.redis.del(&timer_key(attempt_id)).await.context("Failed to delete timer")?;
        Ok(())
    }

    async fn list_expired(&self, now_ms: i64) -> Result<Vec<TimerRecord>> {
        let keys = self
            .redis
            .scan_keys(&format!("{TIMER_PREFIX}*"))
            .await
            .context("Failed to scan timers")?;

        let mut expired = Vec::new();
        for key in keys {
            let raw = match self.redis.get(&key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(error = %err, key = %key, "Failed to read timer during scan");
                    continue;
                }
            };
            match serde_json::from_str::<TimerRecord>(&raw) {
                Ok(record) if record.is_expired(now_ms) => expired.push(record),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, key = %key, "Skipping undecodable timer record");
                }
            }
        }
        Ok(expired)
    }
}
