/// Redis cache for CMS list responses.
///
/// Misses and Redis failures look the same to callers: `None`, then a real CMS request.
///
/// Key schema:
/// - `rc:v1:page:{endpoint}:{sha256(filters|orders|limit|offset)}`: JSON `ListResponse<T>` (TTL)
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use repair_common::cms::{ListQuery, ListResponse};
use repair_common::redis::RedisCache;

const KEY_PREFIX: &str = "rc:v1:";

pub struct CaseCache {
    redis: RedisCache,
    ttl_secs: u64,
}

impl CaseCache {
    pub fn new(redis: RedisCache, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    pub async fn is_available(&self) -> bool {
        self.redis.is_available().await
    }

    pub async fn get_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &ListQuery,
    ) -> Option<ListResponse<T>> {
        let key = page_key(endpoint, query);
        let json = self.redis.get(&key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key = %key, "cache deserialization failed"))
            .ok()
    }

    pub async fn set_page<T: Serialize>(
        &self,
        endpoint: &str,
        query: &ListQuery,
        page: &ListResponse<T>,
    ) {
        let key = page_key(endpoint, query);
        if let Ok(json) = serde_json::to_string(page) {
            self.redis.set_with_ttl(&key, &json, self.ttl_secs).await;
        }
    }

    /// Drops every cached page so the next fetch reaches the CMS.
    pub async fn invalidate_all(&self) {
        self.redis.delete_by_prefix(KEY_PREFIX).await;
    }
}

fn page_key(endpoint: &str, query: &ListQuery) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.filters.as_deref().unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(query.orders.as_deref().unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(query.effective_limit().to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(query.offset.to_string().as_bytes());
    format!("{KEY_PREFIX}page:{endpoint}:{:x}", hasher.finalize())
}
