/// Embedding backends for prompt similarity search.
///
/// `TextEmbedding` from fastembed is synchronous and CPU-bound. All embed calls go through
/// `tokio::task::spawn_blocking`, with the model shared behind an `Arc`.
///
/// Two models are supported:
/// - all-MiniLM-L6-v2 (384 dims): plain inputs, no prefixes
/// - nomic-embed-text-v1.5 (768 dims): task-prefixed inputs
///   ("search_document: {text}" for documents, "search_query: {text}" for queries)
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CommonError;

/// Anything that can turn prompt texts and queries into fixed-size vectors.
///
/// Every vector returned by one implementation has exactly `dimensions()` elements.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed documents for indexing.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CommonError>;

    /// Embed a single query for search.
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, CommonError>;

    /// Dimensionality of the produced vectors.
    fn dimensions(&self) -> usize;
}

/// Embedding model selection, parsed from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingModelKind {
    AllMiniLmL6V2,
    NomicEmbedTextV15,
}

impl EmbeddingModelKind {
    pub fn dimensions(self) -> usize {
        match self {
            Self::AllMiniLmL6V2 => 384,
            Self::NomicEmbedTextV15 => 768,
        }
    }

    fn document_prefix(self) -> &'static str {
        match self {
            Self::AllMiniLmL6V2 => "",
            Self::NomicEmbedTextV15 => "search_document: ",
        }
    }

    fn query_prefix(self) -> &'static str {
        match self {
            Self::AllMiniLmL6V2 => "",
            Self::NomicEmbedTextV15 => "search_query: ",
        }
    }

    fn fastembed_model(self) -> fastembed::EmbeddingModel {
        match self {
            Self::AllMiniLmL6V2 => fastembed::EmbeddingModel::AllMiniLML6V2,
            Self::NomicEmbedTextV15 => fastembed::EmbeddingModel::NomicEmbedTextV15,
        }
    }
}

impl FromStr for EmbeddingModelKind {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all-minilm-l6-v2" | "all-minilm-l6" | "minilm" => Ok(Self::AllMiniLmL6V2),
            "nomic-embed-text-v1.5" | "nomic" => Ok(Self::NomicEmbedTextV15),
            other => Err(CommonError::Embedding(format!(
                "unknown embedding model '{other}' (expected all-minilm-l6-v2 or nomic-embed-text-v1.5)"
            ))),
        }
    }
}

impl fmt::Display for EmbeddingModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AllMiniLmL6V2 => "all-minilm-l6-v2",
            Self::NomicEmbedTextV15 => "nomic-embed-text-v1.5",
        };
        f.write_str(name)
    }
}

/// Wraps fastembed's `TextEmbedding` model for generating vector embeddings.
pub struct Embedder {
    kind: EmbeddingModelKind,
    model: Arc<fastembed::TextEmbedding>,
}

impl Embedder {
    /// Initialize the embedding model.
    ///
    /// This downloads the model on first run. The download happens synchronously
    /// inside a blocking task.
    pub async fn new(kind: EmbeddingModelKind) -> Result<Self, CommonError> {
        let model = tokio::task::spawn_blocking(move || {
            let options = fastembed::InitOptions::new(kind.fastembed_model())
                .with_show_download_progress(true);
            fastembed::TextEmbedding::try_new(options)
        })
        .await
        .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
        .map_err(|e| CommonError::Embedding(format!("model initialization failed: {e}")))?;

        Ok(Self {
            kind,
            model: Arc::new(model),
        })
    }

    pub fn kind(&self) -> EmbeddingModelKind {
        self.kind
    }
}

#[async_trait]
impl TextEmbedder for Embedder {
    /// Documents are processed in small batches to bound peak memory during ONNX inference.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CommonError> {
        let prefix = self.kind.document_prefix();
        let prefixed: Vec<String> = texts.iter().map(|t| format!("{prefix}{t}")).collect();
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || model.embed(prefixed, Some(4)))
            .await
            .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
            .map_err(|e| CommonError::Embedding(format!("document embedding failed: {e}")))
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, CommonError> {
        let prefixed = vec![format!("{}{query}", self.kind.query_prefix())];
        let model = Arc::clone(&self.model);
        let mut results = tokio::task::spawn_blocking(move || model.embed(prefixed, None))
            .await
            .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
            .map_err(|e| CommonError::Embedding(format!("query embedding failed: {e}")))?;
        results
            .pop()
            .ok_or_else(|| CommonError::Embedding("empty embedding result".to_string()))
    }

    fn dimensions(&self) -> usize {
        self.kind.dimensions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_model_names() {
        assert_eq!(
            "all-MiniLM-L6-v2".parse::<EmbeddingModelKind>().unwrap(),
            EmbeddingModelKind::AllMiniLmL6V2
        );
        assert_eq!(
            " nomic-embed-text-v1.5 ".parse::<EmbeddingModelKind>().unwrap(),
            EmbeddingModelKind::NomicEmbedTextV15
        );
        assert!("bert-base".parse::<EmbeddingModelKind>().is_err());
    }

    #[test]
    fn test_prefixes_follow_model() {
        assert_eq!(EmbeddingModelKind::AllMiniLmL6V2.query_prefix(), "");
        assert_eq!(
            EmbeddingModelKind::NomicEmbedTextV15.query_prefix(),
            "search_query: "
        );
        assert_eq!(EmbeddingModelKind::NomicEmbedTextV15.dimensions(), 768);
        assert_eq!(EmbeddingModelKind::AllMiniLmL6V2.dimensions(), 384);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for kind in [
            EmbeddingModelKind::AllMiniLmL6V2,
            EmbeddingModelKind::NomicEmbedTextV15,
        ] {
            assert_eq!(kind.to_string().parse::<EmbeddingModelKind>().unwrap(), kind);
        }
    }
}
