/// Persistent prompt store backed by LanceDB.
///
/// Table schema:
/// - text: Utf8 (not null), the prompt body that was embedded
/// - category: Utf8 (not null)
/// - for_devs: Boolean (not null)
/// - embedding: FixedSizeList<Float32, dims> (not null)
///
/// Reads never fail past this boundary: search errors become an empty result list and
/// stats errors become a zeroed `StoreStats` carrying the message.
use std::collections::BTreeSet;
use std::sync::Arc;

use arrow_array::{
    Array, ArrayRef, BooleanArray, FixedSizeListArray, Float32Array, RecordBatch, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::cache::PromptCache;
use crate::error::AppError;
use crate::model::{AudienceFilter, PromptRecord, SearchResult, StoreStats};
use prompt_common::embedding::TextEmbedder;
use prompt_common::error::CommonError;
use prompt_common::vectordb::VectorDb;

/// Ranked similarity search over stored prompts.
#[async_trait]
pub trait PromptSearch: Send + Sync {
    /// Up to `limit` results ordered by descending similarity. Only records whose
    /// `for_devs` equals `filter.for_devs` are eligible when a filter is given.
    /// Backend failures yield an empty list.
    async fn search(
        &self,
        query: &str,
        filter: Option<AudienceFilter>,
        limit: usize,
    ) -> Vec<SearchResult>;
}

pub struct PromptStore {
    embedder: Arc<dyn TextEmbedder>,
    vectordb: Arc<VectorDb>,
    cache: Arc<PromptCache>,
    table_name: String,
}

impl PromptStore {
    pub fn new(
        embedder: Arc<dyn TextEmbedder>,
        vectordb: Arc<VectorDb>,
        cache: Arc<PromptCache>,
        table_name: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            vectordb,
            cache,
            table_name: table_name.into(),
        }
    }

    /// Whether the collection already holds data from an earlier run.
    pub async fn is_populated(&self) -> Result<bool, CommonError> {
        self.vectordb.table_exists(&self.table_name).await
    }

    /// Embed and persist a batch of records. Returns how many were stored.
    ///
    /// An empty batch, or one containing a record without text or category, is rejected
    /// as a whole: it is logged and `Ok(0)` is returned without touching storage.
    pub async fn add(&self, records: &[PromptRecord]) -> Result<usize, AppError> {
        if records.is_empty() {
            warn!("no prompts to add, batch is empty");
            return Ok(0);
        }
        if let Some(pos) = records.iter().position(|r| !r.is_complete()) {
            warn!(
                index = pos,
                "prompt batch rejected: record is missing text or category"
            );
            return Ok(0);
        }

        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let embeddings = self.embedder.embed_documents(&texts).await?;
        if embeddings.len() != records.len() {
            return Err(CommonError::Embedding(format!(
                "embedding count mismatch: expected {}, got {}",
                records.len(),
                embeddings.len()
            ))
            .into());
        }

        let batch = build_record_batch(records, &embeddings, self.embedder.dimensions())?;
        self.vectordb
            .append(&self.table_name, batch.schema(), vec![batch])
            .await?;

        self.cache.invalidate().await;

        info!(
            table = %self.table_name,
            added = records.len(),
            "prompts added"
        );
        Ok(records.len())
    }

    /// Collection statistics. Never fails; read errors are reported in `error`.
    pub async fn stats(&self) -> StoreStats {
        match self.try_stats().await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, table = %self.table_name, "reading prompt stats failed");
                StoreStats::unavailable(e.to_string())
            }
        }
    }

    async fn try_stats(&self) -> Result<StoreStats, CommonError> {
        if !self.vectordb.table_exists(&self.table_name).await? {
            return Ok(StoreStats::default());
        }

        let batches = self
            .vectordb
            .scan(&self.table_name, &["category", "for_devs"])
            .await?;

        let mut total_count = 0;
        let mut dev_count = 0;
        let mut categories = BTreeSet::new();
        for batch in &batches {
            let (Some(category_col), Some(dev_col)) = (
                string_column(batch, "category"),
                bool_column(batch, "for_devs"),
            ) else {
                return Err(CommonError::VectorDb(
                    "stats batch missing category or for_devs column".to_string(),
                ));
            };
            for row in 0..batch.num_rows() {
                total_count += 1;
                categories.insert(category_col.value(row).to_string());
                if dev_col.value(row) {
                    dev_count += 1;
                }
            }
        }

        Ok(StoreStats {
            total_count,
            distinct_categories: categories.len(),
            category_list: categories.into_iter().collect(),
            dev_count,
            error: None,
        })
    }

    async fn try_search(
        &self,
        query: &str,
        filter: Option<AudienceFilter>,
        limit: usize,
    ) -> Result<Vec<SearchResult>, CommonError> {
        if let Some(cached) = self.cache.get_search_results(query, filter, limit).await {
            debug!(query, "search cache hit");
            return Ok(cached);
        }

        let query_embedding = self.embedder.embed_query(query).await?;
        let predicate = filter.map(|f| format!("for_devs = {}", f.for_devs));
        let batches = self
            .vectordb
            .search(
                &self.table_name,
                &query_embedding,
                predicate.as_deref(),
                limit,
            )
            .await?;

        let mut results = extract_search_results(&batches);
        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(limit);

        self.cache
            .set_search_results(query, filter, limit, &results)
            .await;
        Ok(results)
    }
}

#[async_trait]
impl PromptSearch for PromptStore {
    async fn search(
        &self,
        query: &str,
        filter: Option<AudienceFilter>,
        limit: usize,
    ) -> Vec<SearchResult> {
        if limit == 0 {
            return Vec::new();
        }
        match self.try_search(query, filter, limit).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, query, "prompt search failed, treating as no results");
                Vec::new()
            }
        }
    }
}

/// Map a cosine distance (0 = identical, 2 = opposite) to a similarity in [0, 1].
fn distance_to_similarity(distance: f32) -> f32 {
    if !distance.is_finite() {
        return 0.0;
    }
    (1.0 - distance).clamp(0.0, 1.0)
}

/// Extract `SearchResult` values from LanceDB search result batches.
///
/// Expected columns: text (Utf8), category (Utf8), for_devs (Boolean), _distance (Float32)
fn extract_search_results(batches: &[RecordBatch]) -> Vec<SearchResult> {
    let mut results = Vec::new();

    for batch in batches {
        let (Some(text_col), Some(category_col), Some(dev_col)) = (
            string_column(batch, "text"),
            string_column(batch, "category"),
            bool_column(batch, "for_devs"),
        ) else {
            warn!("search result batch missing expected columns");
            continue;
        };
        let distance_col = float_column(batch, "_distance");

        for row in 0..batch.num_rows() {
            let distance = distance_col.map(|c| c.value(row)).unwrap_or(f32::NAN);
            results.push(SearchResult {
                prompt: text_col.value(row).to_string(),
                category: category_col.value(row).to_string(),
                for_devs: !dev_col.is_null(row) && dev_col.value(row),
                similarity: distance_to_similarity(distance),
            });
        }
    }

    results
}

/// Build an Arrow RecordBatch from prompt records and their embeddings.
fn build_record_batch(
    records: &[PromptRecord],
    embeddings: &[Vec<f32>],
    dimensions: usize,
) -> Result<RecordBatch, CommonError> {
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
        return Err(CommonError::Embedding(format!(
            "embedding has {} dimensions, expected {dimensions}",
            bad.len()
        )));
    }
    let dim = i32::try_from(dimensions)
        .map_err(|_| CommonError::Embedding(format!("dimension {dimensions} too large")))?;

    let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
    let categories: Vec<&str> = records.iter().map(|r| r.category.as_str()).collect();
    let flags: Vec<bool> = records.iter().map(|r| r.for_devs).collect();

    let text_array: ArrayRef = Arc::new(StringArray::from(texts));
    let category_array: ArrayRef = Arc::new(StringArray::from(categories));
    let flag_array: ArrayRef = Arc::new(BooleanArray::from(flags));

    let item_field = Arc::new(Field::new("item", DataType::Float32, true));
    let flat_values: Vec<f32> = embeddings.iter().flatten().copied().collect();
    let embedding_array: ArrayRef = Arc::new(
        FixedSizeListArray::try_new(
            Arc::clone(&item_field),
            dim,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| CommonError::VectorDb(format!("failed to build embedding array: {e}")))?,
    );

    let schema = Arc::new(Schema::new(vec![
        Field::new("text", DataType::Utf8, false),
        Field::new("category", DataType::Utf8, false),
        Field::new("for_devs", DataType::Boolean, false),
        Field::new("embedding", DataType::FixedSizeList(item_field, dim), false),
    ]));

    RecordBatch::try_new(
        schema,
        vec![text_array, category_array, flag_array, embedding_array],
    )
    .map_err(|e| CommonError::VectorDb(format!("failed to build record batch: {e}")))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a StringArray> {
    batch.column_by_name(name)?.as_any().downcast_ref()
}

fn bool_column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a BooleanArray> {
    batch.column_by_name(name)?.as_any().downcast_ref()
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> Option<&'a Float32Array> {
    batch.column_by_name(name)?.as_any().downcast_ref()
}
