/// Redis caching layer for prompt searches.
///
/// All operations degrade to misses when Redis is unavailable.
///
/// Key schema (namespaced per store so several collections can share one Redis):
/// - `prompts:v1:{table}:{store}:search:{sha256(query|filter|limit)}`: JSON `Vec<SearchResult>` (TTL: 3600s)
///
/// `{store}` is a short sha256 digest of the store path and embedding model, so two
/// stores with the same table name never read or drop each other's entries. The whole
/// namespace is dropped after every successful ingestion.
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::model::{AudienceFilter, SearchResult};
use prompt_common::redis::RedisCache;

const KEY_PREFIX: &str = "prompts:v1:";
const SEARCH_TTL_SECS: u64 = 3600;
/// Hex characters of the store digest kept in the namespace.
const STORE_DIGEST_LEN: usize = 16;

pub struct PromptCache {
    redis: RedisCache,
    namespace: String,
}

impl PromptCache {
    pub fn new(
        redis: RedisCache,
        table_name: &str,
        store_path: &str,
        embedding_model: &str,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(store_path.as_bytes());
        hasher.update(b"|");
        hasher.update(embedding_model.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        Self {
            redis,
            namespace: format!(
                "{KEY_PREFIX}{table_name}:{}:",
                &digest[..STORE_DIGEST_LEN]
            ),
        }
    }

    pub async fn get_search_results(
        &self,
        query: &str,
        filter: Option<AudienceFilter>,
        limit: usize,
    ) -> Option<Vec<SearchResult>> {
        let key = self.search_key(query, filter, limit);
        let json = self.redis.get(&key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    pub async fn set_search_results(
        &self,
        query: &str,
        filter: Option<AudienceFilter>,
        limit: usize,
        results: &[SearchResult],
    ) {
        let key = self.search_key(query, filter, limit);
        if let Ok(json) = serde_json::to_string(results) {
            self.redis.set_with_ttl(&key, &json, SEARCH_TTL_SECS).await;
        }
    }

    /// Drop every cached search for this store. Called after the collection changes.
    pub async fn invalidate(&self) {
        self.redis.delete_by_prefix(&self.namespace).await;
    }

    /// Deterministic cache key for a search using SHA-256.
    fn search_key(&self, query: &str, filter: Option<AudienceFilter>, limit: usize) -> String {
        let filter_tag = match filter {
            Some(AudienceFilter { for_devs: true }) => "devs",
            Some(AudienceFilter { for_devs: false }) => "general",
            None => "any",
        };
        let mut hasher = Sha256::new();
        hasher.update(query.as_bytes());
        hasher.update(b"|");
        hasher.update(filter_tag.as_bytes());
        hasher.update(b"|");
        hasher.update(limit.to_string().as_bytes());
        format!("{}search:{:x}", self.namespace, hasher.finalize())
    }
}
