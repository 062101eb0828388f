use serde::{Deserialize, Serialize};

use prompt_common::mcp_api::{PromptResult, PromptStatsResponse};

/// Category of the clarification answer returned for queries that are too short.
pub const CATEGORY_GENERAL: &str = "General";
/// Category of prompts synthesized from a template when nothing was retrieved.
pub const CATEGORY_GENERATED: &str = "Generated";

/// A stored example prompt (e.g. category "Linux Terminal", text "I want you to act as...").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRecord {
    pub text: String,
    pub category: String,
    /// Whether the prompt targets developers. Defaults to `false` when the source omits it.
    pub for_devs: bool,
}

impl PromptRecord {
    pub fn new(text: impl Into<String>, category: impl Into<String>, for_devs: bool) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
            for_devs,
        }
    }

    /// A record can be stored only if both its text and category carry content.
    pub fn is_complete(&self) -> bool {
        !self.text.trim().is_empty() && !self.category.trim().is_empty()
    }
}

/// A prompt recommendation, either retrieved from the store or synthesized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub prompt: String,
    pub category: String,
    pub for_devs: bool,
    /// In [0, 1]; exactly 0.0 for synthesized results.
    pub similarity: f32,
}

impl SearchResult {
    pub fn synthesized(prompt: String, category: &str, for_devs: bool) -> Self {
        Self {
            prompt,
            category: category.to_string(),
            for_devs,
            similarity: 0.0,
        }
    }
}

impl From<SearchResult> for PromptResult {
    fn from(r: SearchResult) -> Self {
        PromptResult {
            prompt: r.prompt,
            category: r.category,
            for_devs: r.for_devs,
            similarity: r.similarity,
        }
    }
}

/// Per-query working state of the retrieval pipeline. Lives for one call.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub raw_query: String,
    pub normalized_query: String,
    pub is_dev_related: bool,
}

/// Metadata restriction applied to a store search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudienceFilter {
    pub for_devs: bool,
}

/// Summary of the stored prompt collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_count: usize,
    pub distinct_categories: usize,
    /// Sorted, deduplicated.
    pub category_list: Vec<String>,
    pub dev_count: usize,
    /// Set when the store could not be read; all counts are zero in that case.
    pub error: Option<String>,
}

impl StoreStats {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

impl From<StoreStats> for PromptStatsResponse {
    fn from(s: StoreStats) -> Self {
        PromptStatsResponse {
            total_count: s.total_count,
            distinct_categories: s.distinct_categories,
            categories: s.category_list,
            dev_count: s.dev_count,
            error: s.error,
        }
    }
}
