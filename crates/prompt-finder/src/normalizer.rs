/// Query normalization: reduces a free-text query to its significant keywords.
///
/// The query is split into sub-word tokens by a fixed vocabulary-based tokenizer
/// (GPT-2 byte-level BPE in production). Each token is mapped back to the span of the
/// query it covers, so tokenizer markers such as the `Ġ` word-start prefix never reach
/// the keyword filter. Pieces are lower-cased, stripped of non-word characters, and
/// stop-words are dropped.
use std::collections::HashSet;

use regex::Regex;
use tokenizers::Tokenizer;
use tracing::warn;

use prompt_common::error::CommonError;

/// Minimum number of keywords for the normalized form to replace the raw query.
const MIN_KEYWORDS: usize = 2;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "in", "on", "at", "for", "with", "by", "to", "and", "or", "of", "is",
    "are", "am", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does",
    "did", "will", "would", "shall", "should", "can", "could", "may", "might", "must", "about",
    "as", "from", "like", "that", "this", "there", "these", "those",
];

pub struct QueryNormalizer {
    tokenizer: Tokenizer,
    non_word_re: Regex,
    stopwords: HashSet<&'static str>,
}

impl QueryNormalizer {
    pub fn new(tokenizer: Tokenizer) -> Self {
        Self {
            tokenizer,
            non_word_re: Regex::new(r"[^\w\s]").expect("valid regex"),
            stopwords: STOPWORDS.iter().copied().collect(),
        }
    }

    /// Split a query into the sub-word pieces produced by the tokenizer, as slices of the
    /// query. Pieces keep any leading whitespace the token absorbed.
    pub fn tokenize<'q>(&self, query: &'q str) -> Result<Vec<&'q str>, CommonError> {
        let encoding = self
            .tokenizer
            .encode(query, false)
            .map_err(|e| CommonError::Tokenizer(format!("failed to tokenize query: {e}")))?;
        Ok(pieces_from_offsets(query, encoding.get_offsets()))
    }

    /// Keywords of the query in order, with punctuation and stop-words removed.
    pub fn keywords(&self, query: &str) -> Result<Vec<String>, CommonError> {
        let keywords = self
            .tokenize(query)?
            .into_iter()
            .filter_map(|piece| {
                let lowered = piece.to_lowercase();
                let cleaned = self.non_word_re.replace_all(&lowered, "");
                let keyword = cleaned.trim();
                if keyword.is_empty() || self.stopwords.contains(keyword) {
                    None
                } else {
                    Some(keyword.to_string())
                }
            })
            .collect();
        Ok(keywords)
    }

    /// Space-joined keywords, or the untouched query when fewer than two keywords survive.
    pub fn normalize(&self, query: &str) -> String {
        let keywords = match self.keywords(query) {
            Ok(keywords) => keywords,
            Err(e) => {
                warn!(error = %e, "query tokenization failed, searching raw query");
                return query.to_string();
            }
        };
        if keywords.len() < MIN_KEYWORDS {
            return query.to_string();
        }
        keywords.join(" ")
    }
}

/// Cut the query at token byte offsets. Byte-level tokens that split one character all
/// point at that whole character; only the first of them keeps it.
fn pieces_from_offsets<'q>(query: &'q str, offsets: &[(usize, usize)]) -> Vec<&'q str> {
    let mut pieces = Vec::with_capacity(offsets.len());
    let mut cursor = 0;
    for &(start, end) in offsets {
        let start = start.max(cursor);
        if start >= end {
            continue;
        }
        if let Some(piece) = query.get(start..end) {
            pieces.push(piece);
            cursor = end;
        }
    }
    pieces
}
