//! Table binding for validation runs.
//!
//! A [`TableHandle`] pairs a DataFusion [`SessionContext`] with the name of
//! the table a plan runs against. The handle is the backend-agnostic seam:
//! the engine never cares whether the name resolves to an in-memory
//! [`MemTable`], a Parquet scan, or a database-backed table provider
//! registered by the caller. The handle is treated as a read-only shared
//! resource for the duration of a run; no step mutates it.

use crate::error::{GuardError, Result};
use crate::security::SqlSecurity;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use std::sync::Arc;
use tracing::debug;

/// A handle to the table a validation plan runs against.
#[derive(Clone)]
pub struct TableHandle {
    ctx: SessionContext,
    table_name: Arc<str>,
}

impl std::fmt::Debug for TableHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableHandle")
            .field("table_name", &self.table_name)
            .finish_non_exhaustive()
    }
}

impl TableHandle {
    /// Binds a table that is already registered in the given session context.
    ///
    /// Use this for database-backed or file-backed tables registered through
    /// DataFusion table providers.
    pub fn from_context(ctx: SessionContext, table_name: impl Into<Arc<str>>) -> Self {
        Self {
            ctx,
            table_name: table_name.into(),
        }
    }

    /// Builds an in-memory table from Arrow record batches.
    ///
    /// All batches must share the same schema. Fails with a configuration
    /// error when no batches are given.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use arrow::array::Float64Array;
    /// use arrow::datatypes::{DataType, Field, Schema};
    /// use arrow::record_batch::RecordBatch;
    /// use frame_guard::sources::TableHandle;
    /// use std::sync::Arc;
    ///
    /// # async fn example() -> frame_guard::error::Result<()> {
    /// let schema = Arc::new(Schema::new(vec![Field::new("d", DataType::Float64, true)]));
    /// let batch = RecordBatch::try_new(
    ///     schema,
    ///     vec![Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0]))],
    /// )?;
    /// let table = TableHandle::from_batches("data", vec![batch]).await?;
    /// assert_eq!(table.table_name(), "data");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn from_batches(
        table_name: impl Into<Arc<str>>,
        batches: Vec<RecordBatch>,
    ) -> Result<Self> {
        let table_name = table_name.into();
        let schema = batches
            .first()
            .map(|batch| batch.schema())
            .ok_or_else(|| {
                GuardError::Configuration(
                    "cannot build an in-memory table from zero batches".to_string(),
                )
            })?;

        let row_count: usize = batches.iter().map(RecordBatch::num_rows).sum();
        debug!(
            table.name = %table_name,
            table.rows = row_count,
            table.batches = batches.len(),
            "Registering in-memory table"
        );

        let provider = MemTable::try_new(schema, vec![batches])?;
        let ctx = SessionContext::new();
        ctx.register_table(table_name.as_ref(), Arc::new(provider))?;
        Ok(Self { ctx, table_name })
    }

    /// Builds an in-memory table from a single record batch.
    pub async fn from_batch(table_name: impl Into<Arc<str>>, batch: RecordBatch) -> Result<Self> {
        Self::from_batches(table_name, vec![batch]).await
    }

    /// Returns the name of the bound table.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns the bound table name validated and double-quoted for SQL use.
    pub fn quoted_name(&self) -> Result<String> {
        SqlSecurity::quote_identifier(&self.table_name)
    }

    /// Returns the underlying session context.
    pub fn ctx(&self) -> &SessionContext {
        &self.ctx
    }

    /// Returns the schema of the bound table.
    pub async fn schema(&self) -> Result<SchemaRef> {
        let provider = self.ctx.table_provider(self.table_name.as_ref()).await?;
        Ok(provider.schema())
    }

    /// Runs a SQL query against the bound context and collects the results.
    pub async fn collect(&self, sql: &str) -> Result<Vec<RecordBatch>> {
        debug!(table.name = %self.table_name, query = %sql, "Executing evaluator query");
        let df = self.ctx.sql(sql).await?;
        Ok(df.collect().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};

    fn sample_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)]));
        RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![1, 2, 3]))])
            .expect("batch is valid")
    }

    #[tokio::test]
    async fn test_from_batches_registers_table() {
        let table = TableHandle::from_batch("events", sample_batch())
            .await
            .unwrap();
        assert_eq!(table.table_name(), "events");

        let schema = table.schema().await.unwrap();
        assert_eq!(schema.fields().len(), 1);
        assert_eq!(schema.field(0).name(), "id");
    }

    #[tokio::test]
    async fn test_from_batches_rejects_empty() {
        let result = TableHandle::from_batches("empty", vec![]).await;
        assert!(matches!(result, Err(GuardError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_collect_runs_sql() {
        let table = TableHandle::from_batch("events", sample_batch())
            .await
            .unwrap();
        let batches = table
            .collect("SELECT COUNT(*) AS n FROM \"events\"")
            .await
            .unwrap();
        assert_eq!(batches[0].num_rows(), 1);
    }

    #[tokio::test]
    async fn test_quoted_name_rejects_hostile_table() {
        let ctx = SessionContext::new();
        let table = TableHandle::from_context(ctx, "data; DROP TABLE users");
        assert!(table.quoted_name().is_err());
    }
}
