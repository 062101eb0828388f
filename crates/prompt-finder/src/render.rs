use std::fmt::Write as _;

use crate::model::{SearchResult, StoreStats};

const RULE_WIDTH: usize = 50;
const CATEGORY_PREVIEW: usize = 5;

/// Text block shown for a recommended prompt. The relevance line only appears for
/// retrieved prompts (similarity above zero).
pub fn render_result(result: &SearchResult) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Category: {}", result.category);
    let _ = writeln!(
        out,
        "For developers: {}",
        if result.for_devs { "Yes" } else { "No" }
    );
    if result.similarity > 0.0 {
        let _ = writeln!(out, "Relevance: {:.2}", result.similarity);
    }
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{}", result.prompt);
    let _ = write!(out, "{rule}");
    out
}

pub fn render_stats(stats: &StoreStats) -> String {
    let mut out = String::from("Prompt collection:\n");
    if let Some(error) = &stats.error {
        let _ = writeln!(out, "error: {error}");
    }
    let _ = writeln!(out, "prompts: {}", stats.total_count);
    let _ = writeln!(out, "developer prompts: {}", stats.dev_count);

    let preview: Vec<&str> = stats
        .category_list
        .iter()
        .take(CATEGORY_PREVIEW)
        .map(String::as_str)
        .collect();
    let more = if stats.distinct_categories > preview.len() {
        "..."
    } else {
        ""
    };
    let _ = write!(
        out,
        "categories: {}{more} ({} total)",
        preview.join(", "),
        stats.distinct_categories
    );
    out
}
