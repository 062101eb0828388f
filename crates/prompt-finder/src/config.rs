use std::path::PathBuf;

use prompt_common::embedding::EmbeddingModelKind;
use prompt_common::tokenizer::TokenizerSource;

use crate::error::AppError;

const DEFAULT_TABLE: &str = "prompts";

/// Application configuration loaded explicitly from environment variables.
///
/// The store path has no default; the caller must point it at a directory.
/// Redis URL is optional; if absent, search results are not cached.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL (e.g. "redis://127.0.0.1:6379"). `None` disables caching.
    pub redis_url: Option<String>,
    /// Filesystem path to the LanceDB directory holding the prompt collection.
    pub store_path: String,
    /// LanceDB table name for prompt records.
    pub table_name: String,
    pub embedding_model: EmbeddingModelKind,
    /// Query tokenizer; GPT-2 from the Hugging Face hub unless a local file is given.
    pub tokenizer: TokenizerSource,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `PROMPT_STORE_PATH`: directory of the persisted prompt collection
    ///
    /// Optional:
    /// - `PROMPT_TABLE`: table name (default: "prompts")
    /// - `EMBEDDING_MODEL`: "all-minilm-l6-v2" (default) or "nomic-embed-text-v1.5"
    /// - `REDIS_URL`: Redis connection string (omit to disable caching)
    /// - `TOKENIZER_PATH`: local `tokenizer.json` (default: GPT-2 from the hub)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let store_path = var("PROMPT_STORE_PATH")
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("PROMPT_STORE_PATH environment variable is required".to_string())
            })?;

        let table_name = var("PROMPT_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string());
        if table_name.is_empty()
            || !table_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(AppError::Config(format!(
                "PROMPT_TABLE must be a non-empty name of letters, digits, '_' or '-', got '{table_name}'"
            )));
        }

        let embedding_model = match var("EMBEDDING_MODEL") {
            Some(name) => name
                .parse()
                .map_err(|e| AppError::Config(format!("EMBEDDING_MODEL: {e}")))?,
            None => EmbeddingModelKind::AllMiniLmL6V2,
        };

        let tokenizer = var("TOKENIZER_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(|p| TokenizerSource::File(PathBuf::from(p)))
            .unwrap_or_default();

        Ok(Self {
            redis_url: var("REDIS_URL"),
            store_path,
            table_name,
            embedding_model,
            tokenizer,
        })
    }
}
