/// Vocabulary-based tokenizer used to split queries into sub-word pieces.
///
/// The default is the GPT-2 byte-level BPE tokenizer, fetched from the Hugging Face hub
/// on first run and cached locally. A `tokenizer.json` on disk can be used instead for
/// offline installs. Loading is blocking I/O and runs inside `spawn_blocking`.
use std::path::PathBuf;

use tokenizers::Tokenizer;

use crate::error::CommonError;

/// Hub repository of the default tokenizer.
pub const DEFAULT_TOKENIZER_REPO: &str = "openai-community/gpt2";

/// Where to load the tokenizer definition from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizerSource {
    /// A serialized `tokenizer.json`.
    File(PathBuf),
    /// A Hugging Face hub repository holding a `tokenizer.json`.
    Hub(String),
}

impl Default for TokenizerSource {
    fn default() -> Self {
        Self::Hub(DEFAULT_TOKENIZER_REPO.to_string())
    }
}

impl std::fmt::Display for TokenizerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::Hub(repo) => write!(f, "hub:{repo}"),
        }
    }
}

pub async fn load_tokenizer(source: TokenizerSource) -> Result<Tokenizer, CommonError> {
    tokio::task::spawn_blocking(move || match &source {
        TokenizerSource::File(path) => Tokenizer::from_file(path),
        TokenizerSource::Hub(repo) => Tokenizer::from_pretrained(repo, None),
    })
    .await
    .map_err(|e| CommonError::Tokenizer(format!("spawn_blocking join error: {e}")))?
    .map_err(|e| CommonError::Tokenizer(format!("tokenizer initialization failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_source_is_gpt2() {
        assert_eq!(
            TokenizerSource::default(),
            TokenizerSource::Hub("openai-community/gpt2".to_string())
        );
        assert_eq!(
            TokenizerSource::default().to_string(),
            "hub:openai-community/gpt2"
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let err = load_tokenizer(TokenizerSource::File(PathBuf::from(
            "/nonexistent/tokenizer.json",
        )))
        .await
        .unwrap_err();
        assert!(err.to_string().contains("tokenizer initialization failed"));
    }
}
