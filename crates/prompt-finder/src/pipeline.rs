/// Prompt recommendation pipeline.
///
/// guard → classify → normalize → retrieve → best match, or a templated prompt when the
/// store has nothing (which includes the store being unavailable). There are no retries
/// and no re-ranking: the store's first result is returned untouched.
use std::sync::Arc;

use tracing::{debug, info};

use crate::classifier::AudienceClassifier;
use crate::model::{AudienceFilter, QueryContext, SearchResult, CATEGORY_GENERAL, CATEGORY_GENERATED};
use crate::normalizer::QueryNormalizer;
use crate::store::PromptSearch;

/// Queries with fewer characters than this (after trimming) get a clarification request.
const MIN_QUERY_CHARS: usize = 3;
/// Number of candidates requested from the store.
pub const SEARCH_LIMIT: usize = 3;

pub const CLARIFICATION_MESSAGE: &str =
    "Please clarify your request so I can suggest a suitable prompt.";

pub struct PromptPipeline {
    store: Arc<dyn PromptSearch>,
    normalizer: QueryNormalizer,
    classifier: AudienceClassifier,
}

impl PromptPipeline {
    pub fn new(
        store: Arc<dyn PromptSearch>,
        normalizer: QueryNormalizer,
        classifier: AudienceClassifier,
    ) -> Self {
        Self {
            store,
            normalizer,
            classifier,
        }
    }

    /// Recommend a prompt for a free-text query. Never fails.
    pub async fn generate_prompt_for_query(&self, query: &str) -> SearchResult {
        if query.trim().chars().count() < MIN_QUERY_CHARS {
            debug!(query, "query too short, asking for clarification");
            return SearchResult::synthesized(
                CLARIFICATION_MESSAGE.to_string(),
                CATEGORY_GENERAL,
                false,
            );
        }

        let context = self.analyze(query);
        debug!(
            raw = %context.raw_query,
            normalized = %context.normalized_query,
            dev = context.is_dev_related,
            "query analyzed"
        );

        // Only ever narrow to developer prompts; general queries may still match them.
        let filter = context
            .is_dev_related
            .then_some(AudienceFilter { for_devs: true });
        let candidates = self
            .store
            .search(&context.normalized_query, filter, SEARCH_LIMIT)
            .await;

        match candidates.into_iter().next() {
            Some(best) => {
                info!(
                    category = %best.category,
                    similarity = best.similarity,
                    "matched stored prompt"
                );
                best
            }
            None => {
                info!(dev = context.is_dev_related, "no stored prompt matched, generating one");
                fallback_prompt(&context)
            }
        }
    }

    fn analyze(&self, query: &str) -> QueryContext {
        QueryContext {
            raw_query: query.to_string(),
            normalized_query: self.normalizer.normalize(query),
            is_dev_related: self.classifier.is_dev_related(query),
        }
    }
}

/// Templated prompt around the raw query, worded for developers or a general audience.
fn fallback_prompt(context: &QueryContext) -> SearchResult {
    let query = &context.raw_query;
    let prompt = if context.is_dev_related {
        format!(
            "I want you to act as an expert in {query}. Provide a detailed explanation, \
             code examples and best practices on this topic."
        )
    } else {
        format!(
            "I want you to act as an expert on the topic of {query}. Provide detailed \
             information, including key aspects, tips and recommendations on this topic."
        )
    };
    SearchResult::synthesized(prompt, CATEGORY_GENERATED, context.is_dev_related)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PromptRecord;
    use crate::test_support::{
        open_store, word_piece_tokenizer, HashingEmbedder, ScriptedSearch, SearchCall,
    };

    fn pipeline(store: Arc<dyn PromptSearch>) -> PromptPipeline {
        PromptPipeline::new(
            store,
            QueryNormalizer::new(word_piece_tokenizer()),
            AudienceClassifier::new(),
        )
    }

    fn stored(prompt: &str, category: &str, for_devs: bool, similarity: f32) -> SearchResult {
        SearchResult {
            prompt: prompt.to_string(),
            category: category.to_string(),
            for_devs,
            similarity,
        }
    }

    #[tokio::test]
    async fn test_short_queries_ask_for_clarification() {
        let search = Arc::new(ScriptedSearch::returning(vec![stored("x", "Y", true, 0.9)]));
        let pipeline = pipeline(search.clone());

        for query in ["hi", "", "   ", " ab ", "\tок\n"] {
            let result = pipeline.generate_prompt_for_query(query).await;
            assert_eq!(result.prompt, CLARIFICATION_MESSAGE);
            assert_eq!(result.category, "General");
            assert!(!result.for_devs);
            assert_eq!(result.similarity, 0.0);
        }
        assert!(search.calls().is_empty());
    }

    #[tokio::test]
    async fn test_three_characters_pass_the_guard() {
        let search = Arc::new(ScriptedSearch::empty());
        let result = pipeline(search.clone()).generate_prompt_for_query(" sql ").await;
        assert_eq!(result.category, "Generated");
        assert_eq!(search.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_returns_top_result_unmodified() {
        let top = stored("Act as a Docker expert.", "DevOps Engineer", true, 0.42);
        let search = Arc::new(ScriptedSearch::returning(vec![
            top.clone(),
            stored("Act as a sysadmin.", "Sysadmin", true, 0.91),
        ]));
        let result = pipeline(search)
            .generate_prompt_for_query("how do I use docker with python")
            .await;
        assert_eq!(result, top);
    }

    #[tokio::test]
    async fn test_dev_query_searches_normalized_text_with_dev_filter() {
        let search = Arc::new(ScriptedSearch::empty());
        let result = pipeline(search.clone())
            .generate_prompt_for_query("how do I use docker with python")
            .await;

        assert_eq!(
            search.calls(),
            vec![SearchCall {
                query: "how i use docker python".to_string(),
                filter: Some(AudienceFilter { for_devs: true }),
                limit: 3,
            }]
        );
        assert_eq!(result.category, "Generated");
        assert!(result.for_devs);
        assert_eq!(result.similarity, 0.0);
        assert!(result.prompt.contains("how do I use docker with python"));
        assert!(result.prompt.contains("code examples"));
    }

    #[tokio::test]
    async fn test_general_query_is_not_filtered() {
        let search = Arc::new(ScriptedSearch::empty());
        let result = pipeline(search.clone())
            .generate_prompt_for_query("Plan a weekend trip to Lisbon")
            .await;

        let calls = search.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].filter, None);
        assert_eq!(calls[0].query, "plan weekend trip lisbon");
        assert_eq!(result.category, "Generated");
        assert!(!result.for_devs);
        assert!(result.prompt.contains("Plan a weekend trip to Lisbon"));
        assert!(!result.prompt.contains("code examples"));
    }

    #[tokio::test]
    async fn test_general_query_may_return_dev_prompt() {
        let dev_prompt = stored("Act as a regex generator.", "Regex Generator", true, 0.3);
        let search = Arc::new(ScriptedSearch::returning(vec![dev_prompt.clone()]));
        let result = pipeline(search)
            .generate_prompt_for_query("suggest a name for my bakery")
            .await;
        assert_eq!(result, dev_prompt);
    }

    #[tokio::test]
    async fn test_short_keyword_queries_search_raw_text() {
        let search = Arc::new(ScriptedSearch::empty());
        pipeline(search.clone())
            .generate_prompt_for_query("the Chef?")
            .await;
        assert_eq!(search.calls()[0].query, "the Chef?");
    }

    #[tokio::test]
    async fn test_end_to_end_with_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(open_store(dir.path(), Arc::new(HashingEmbedder::new(256))).await);
        let pipeline = pipeline(store.clone());

        // Empty store behaves like "no match".
        let result = pipeline
            .generate_prompt_for_query("how do I use docker with python")
            .await;
        assert_eq!(result.category, "Generated");
        assert!(result.for_devs);

        store
            .add(&[
                PromptRecord::new(
                    "I want you to act as a docker and python mentor",
                    "Docker Mentor",
                    true,
                ),
                PromptRecord::new(
                    "I want you to act as a docker shipping clerk",
                    "Shipping Clerk",
                    false,
                ),
            ])
            .await
            .unwrap();

        let result = pipeline
            .generate_prompt_for_query("how do I use docker with python")
            .await;
        assert_eq!(result.category, "Docker Mentor");
        assert!(result.for_devs);
        assert!(result.similarity > 0.0 && result.similarity <= 1.0);
    }
}
