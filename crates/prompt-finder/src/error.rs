use prompt_common::error::CommonError;

use crate::ingest::IngestError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Common(#[from] CommonError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("config error: {0}")]
    Config(String),
}
