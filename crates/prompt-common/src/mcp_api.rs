use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GeneratePromptParams {
    /// Free-text description of what the prompt should help with.
    pub query: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SearchPromptsParams {
    /// Text to match against stored prompts. Used as-is, without keyword normalization.
    pub query: String,
    /// Restrict results to prompts with this developer flag.
    pub for_devs: Option<bool>,
    /// Maximum number of results to return (default: 3, max: 20).
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct IngestPromptsParams {
    /// Path to a CSV file with `act` and `prompt` columns and an optional `for_devs` column.
    pub csv_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PromptResult {
    pub prompt: String,
    pub category: String,
    pub for_devs: bool,
    /// Cosine similarity in [0, 1]; 0 for prompts that were generated rather than retrieved.
    pub similarity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchPromptsResponse {
    pub results: Vec<PromptResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PromptStatsResponse {
    pub total_count: usize,
    pub distinct_categories: usize,
    pub categories: Vec<String>,
    pub dev_count: usize,
    /// Set when the store could not be read; counts are zero in that case.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IngestPromptsResponse {
    pub added: usize,
    pub total_count: usize,
}
