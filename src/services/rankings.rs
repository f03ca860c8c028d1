use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::core::redis::RedisHandle;
use crate::repositories::store::ExamStore;

const RANK_PREFIX: &str = "rank:";

/// Best-effort cache of student ranks.
#[async_trait]
pub(crate) trait RankCache: Send + Sync {
    async fn get(&self, student_id: &str) -> Result<Option<i64>>;

    async fn set(&self, student_id: &str, rank: i64, ttl_seconds: u64) -> Result<()>;

    /// Drops every cached rank.
    async fn invalidate_all(&self) -> Result<u64>;
}

#[derive(Clone)]
pub(crate) struct RedisRankCache {
    redis: RedisHandle,
}

impl RedisRankCache {
    pub(crate) fn new(redis: RedisHandle) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl RankCache for RedisRankCache {
    async fn get(&self, student_id: &str) -> Result<Option<i64>> {
        let raw = self
            .redis
            .get(&format!("{RANK_PREFIX}{student_id}"))
            .await
            .context("Failed to read cached rank")?;
        raw.map(|value| value.trim().parse::<i64>().context("Cached rank is not an integer"))
            .transpose()
    }

    async fn set(&self, student_id: &str, rank: i64, ttl_seconds: u64) -> Result<()> {
        self.redis
            .set_ex(&format!("{RANK_PREFIX}{student_id}"), &rank.to_string(), ttl_seconds)
            .await
            .context("Failed to cache rank")?;
        Ok(())
    }

    async fn invalidate_all(&self) -> Result<u64> {
        self.redis
            .delete_matching(&format!("{RANK_PREFIX}*"))
            .await
            .context("Failed to invalidate rank cache")
    }
}

/// `round((total - rank) / total * 100)` clamped to `[0, 100]`; a single
/// student is always at 100.
pub(crate) fn percentile(rank: i64, total: i64) -> i64 {
    if total == 1 {
        return 100;
    }
    if total <= 0 || rank <= 0 {
        return 0;
    }
    let value = ((total - rank) as f64 / total as f64 * 100.0).round() as i64;
    value.clamp(0, 100)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Standing {
    pub(crate) rank: i64,
    pub(crate) percentile: i64,
    pub(crate) total_students: i64,
}

#[derive(Clone)]
pub(crate) struct RankService {
    cache: Arc<dyn RankCache>,
    store: Arc<dyn ExamStore>,
    ttl_seconds: u64,
    read_timeout: Duration,
}

impl RankService {
    pub(crate) fn new(
        cache: Arc<dyn RankCache>,
        store: Arc<dyn ExamStore>,
        ttl_seconds: u64,
        read_timeout: Duration,
    ) -> Self {
        Self { cache, store, ttl_seconds, read_timeout }
    }

    /// Cached rank, or a fresh one computed and written back. Returns 0 when
    /// the student has no terminal attempt or the lookup fails.
    pub(crate) async fn get_rank(&self, student_id: &str) -> i64 {
        match tokio::time::timeout(self.read_timeout, self.cache.get(student_id)).await {
            Ok(Ok(Some(rank))) => {
                metrics::counter!("rank_cache_lookups_total", "result" => "hit").increment(1);
                return rank;
            }
            Ok(Ok(None)) => {
                metrics::counter!("rank_cache_lookups_total", "result" => "miss").increment(1);
            }
            Ok(Err(err)) => {
                metrics::counter!("rank_cache_lookups_total", "result" => "error").increment(1);
                tracing::warn!(error = %err, student_id = %student_id, "Rank cache read failed");
            }
            Err(_) => {
                metrics::counter!("rank_cache_lookups_total", "result" => "timeout").increment(1);
                tracing::warn!(student_id = %student_id, "Rank cache read timed out");
            }
        }

        let rank = match self.store.student_rank(student_id).await {
            Ok(Some(rank)) => rank,
            Ok(None) => return 0,
            Err(err) => {
                tracing::error!(error = %err, student_id = %student_id, "Failed to compute rank");
                return 0;
            }
        };

        let write = self.cache.set(student_id, rank, self.ttl_seconds);
        match tokio::time::timeout(self.read_timeout, write).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(error = %err, student_id = %student_id, "Failed to cache rank");
            }
            Err(_) => {
                tracing::warn!(student_id = %student_id, "Timed out caching rank");
            }
        }
        rank
    }

    pub(crate) async fn standing(&self, student_id: &str) -> Standing {
        let rank = self.get_rank(student_id).await;
        let total_students = match self.store.count_ranked_students().await {
            Ok(total) => total,
            Err(err) => {
                tracing::error!(error = %err, "Failed to count ranked students");
                0
            }
        };
        Standing { rank, percentile: percentile(rank, total_students), total_students }
    }

    /// Best effort; errors are logged.
    pub(crate) async fn invalidate_all(&self) {
        match self.cache.invalidate_all().await {
            Ok(deleted) => tracing::debug!(deleted, "Rank cache invalidated"),
            Err(err) => tracing::warn!(error = %err, "Failed to invalidate rank cache"),
        }
    }
}
