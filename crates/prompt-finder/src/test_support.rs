//! Deterministic doubles shared by unit tests.
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use sha2::{Digest, Sha256};
use tokenizers::Tokenizer;

use crate::cache::PromptCache;
use crate::model::{AudienceFilter, SearchResult};
use crate::store::{PromptSearch, PromptStore};
use prompt_common::embedding::TextEmbedder;
use prompt_common::error::CommonError;
use prompt_common::redis::RedisCache;
use prompt_common::vectordb::VectorDb;

pub const TEST_TABLE: &str = "prompts";

/// Small lower-casing WordPiece tokenizer. Words it cannot spell from its vocabulary come
/// back whole as `[UNK]`; "flibbertigibbet" is spelled from sub-word pieces.
pub fn word_piece_tokenizer() -> Tokenizer {
    let words = [
        "[UNK]", "how", "do", "i", "use", "docker", "with", "python", "write", "poem", "sea",
        "what", "new", "rust", "plan", "weekend", "trip", "fl", "##ib", "##ber", "##ti",
        "##gib", "##bet",
    ];
    let vocab: serde_json::Map<String, serde_json::Value> = words
        .iter()
        .enumerate()
        .map(|(id, word)| (word.to_string(), json!(id)))
        .collect();
    let definition = json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": { "type": "Lowercase" },
        "pre_tokenizer": { "type": "BertPreTokenizer" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordPiece",
            "unk_token": "[UNK]",
            "continuing_subword_prefix": "##",
            "max_input_chars_per_word": 100,
            "vocab": vocab
        }
    });
    Tokenizer::from_bytes(definition.to_string()).expect("valid tokenizer definition")
}

/// Bag-of-words embedder: every lower-cased alphanumeric word is hashed into one of
/// `dims` buckets and the resulting count vector is L2-normalized.
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dims];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let digest = Sha256::digest(word.as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            vector[(u64::from_le_bytes(bucket) % self.dims as u64) as usize] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm == 0.0 {
            vector[0] = 1.0;
        } else {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl TextEmbedder for HashingEmbedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CommonError> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, CommonError> {
        Ok(self.embed(query))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Embedder whose backend is always down.
pub struct FailingEmbedder;

#[async_trait]
impl TextEmbedder for FailingEmbedder {
    async fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, CommonError> {
        Err(CommonError::Embedding("model offline".to_string()))
    }

    async fn embed_query(&self, _query: &str) -> Result<Vec<f32>, CommonError> {
        Err(CommonError::Embedding("model offline".to_string()))
    }

    fn dimensions(&self) -> usize {
        256
    }
}

/// A store in `path` without Redis.
pub async fn open_store(path: &Path, embedder: Arc<dyn TextEmbedder>) -> PromptStore {
    let path = path.to_str().expect("temp dir path is utf-8");
    let vectordb = Arc::new(VectorDb::connect(path).await.expect("connect to lancedb"));
    let cache = Arc::new(PromptCache::new(
        RedisCache::disabled(),
        TEST_TABLE,
        path,
        "hashing",
    ));
    PromptStore::new(embedder, vectordb, cache, TEST_TABLE)
}

/// One recorded call to `ScriptedSearch::search`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCall {
    pub query: String,
    pub filter: Option<AudienceFilter>,
    pub limit: usize,
}

/// Search double that returns canned results and records what it was asked.
pub struct ScriptedSearch {
    results: Vec<SearchResult>,
    calls: Mutex<Vec<SearchCall>>,
}

impl ScriptedSearch {
    pub fn returning(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    pub fn calls(&self) -> Vec<SearchCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl PromptSearch for ScriptedSearch {
    async fn search(
        &self,
        query: &str,
        filter: Option<AudienceFilter>,
        limit: usize,
    ) -> Vec<SearchResult> {
        self.calls.lock().expect("calls lock").push(SearchCall {
            query: query.to_string(),
            filter,
            limit,
        });
        self.results.iter().take(limit).cloned().collect()
    }
}
