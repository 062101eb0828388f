/// LanceDB vector database wrapper.
///
/// Provides a typed interface over LanceDB for appending and searching vector embeddings.
/// Tables live in a single directory; reconnecting to the same directory sees every row
/// appended by earlier processes. Callers own the table schema.
use std::sync::Arc;

use arrow_array::{RecordBatch, RecordBatchIterator};
use arrow_schema::Schema;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::DistanceType;
use tracing::{debug, info};

use crate::error::CommonError;

pub struct VectorDb {
    db: lancedb::Connection,
}

impl VectorDb {
    /// Connect to a LanceDB database at the given filesystem path, creating the
    /// directory if it does not exist yet.
    pub async fn connect(path: &str) -> Result<Self, CommonError> {
        std::fs::create_dir_all(path)
            .map_err(|e| CommonError::VectorDb(format!("cannot create {path}: {e}")))?;
        let db = lancedb::connect(path)
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("connection failed: {e}")))?;
        Ok(Self { db })
    }

    /// Returns `true` if a table with this name has been created.
    pub async fn table_exists(&self, table_name: &str) -> Result<bool, CommonError> {
        let names = self
            .db
            .table_names()
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("listing tables failed: {e}")))?;
        Ok(names.iter().any(|n| n == table_name))
    }

    /// Append rows to a table, creating it from the batch schema on first use.
    pub async fn append(
        &self,
        table_name: &str,
        schema: Arc<Schema>,
        batches: Vec<RecordBatch>,
    ) -> Result<(), CommonError> {
        let batch_iter = RecordBatchIterator::new(batches.into_iter().map(Ok), schema);

        if self.table_exists(table_name).await? {
            let table = self.open(table_name).await?;
            table
                .add(Box::new(batch_iter))
                .execute()
                .await
                .map_err(|e| CommonError::VectorDb(format!("append failed: {e}")))?;
            debug!(table = table_name, "rows appended");
        } else {
            self.db
                .create_table(table_name, Box::new(batch_iter))
                .execute()
                .await
                .map_err(|e| CommonError::VectorDb(format!("create table failed: {e}")))?;
            info!(table = table_name, "vector table created");
        }
        Ok(())
    }

    /// Search for the nearest vectors to the given query embedding by cosine distance.
    ///
    /// `filter` is a DataFusion SQL predicate applied before ranking. Returns up to `limit`
    /// rows as RecordBatches, including a `_distance` column added by LanceDB.
    pub async fn search(
        &self,
        table_name: &str,
        query_embedding: &[f32],
        filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RecordBatch>, CommonError> {
        let table = self.open(table_name).await?;

        let mut query = table
            .vector_search(query_embedding)
            .map_err(|e| CommonError::VectorDb(format!("vector search setup failed: {e}")))?
            .distance_type(DistanceType::Cosine)
            .limit(limit);
        if let Some(predicate) = filter {
            query = query.only_if(predicate);
        }

        let results = query
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("vector search failed: {e}")))?;

        futures::TryStreamExt::try_collect(results)
            .await
            .map_err(|e| CommonError::VectorDb(format!("collecting search results failed: {e}")))
    }

    /// Read the given columns of every row in the table.
    pub async fn scan(
        &self,
        table_name: &str,
        columns: &[&str],
    ) -> Result<Vec<RecordBatch>, CommonError> {
        let table = self.open(table_name).await?;

        let results = table
            .query()
            .select(Select::columns(columns))
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("scan failed: {e}")))?;

        futures::TryStreamExt::try_collect(results)
            .await
            .map_err(|e| CommonError::VectorDb(format!("collecting scan results failed: {e}")))
    }

    async fn open(&self, table_name: &str) -> Result<lancedb::Table, CommonError> {
        self.db
            .open_table(table_name)
            .execute()
            .await
            .map_err(|e| CommonError::VectorDb(format!("open table failed: {e}")))
    }
}
