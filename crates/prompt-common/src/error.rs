/// Error types shared by prompt services.
///
/// These errors represent failures in infrastructure components (vector DB, embeddings, tokenizer).
/// Application-specific errors are defined in each service crate and wrap `CommonError`
/// via `#[from]`. The Redis cache never surfaces errors; it degrades to no-ops instead.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("vector db error: {0}")]
    VectorDb(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),
}
