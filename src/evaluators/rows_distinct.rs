//! Evaluator for `rows_distinct` steps.

use crate::core::step::{ColumnTarget, StepKind, ValidationStep};
use crate::core::tally::RawResult;
use crate::error::{ErrorContext, GuardError, Result};
use crate::evaluators::{scalar_count, StepEvaluator};
use crate::security::SqlSecurity;
use crate::sources::TableHandle;
use async_trait::async_trait;
use tracing::instrument;

/// Checks that rows are distinct over the target columns, or over the whole
/// row when no target is given.
///
/// Every row is a test unit; a row fails when it belongs to a group that
/// occurs more than once.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowsDistinctEvaluator;

#[async_trait]
impl StepEvaluator for RowsDistinctEvaluator {
    fn kind(&self) -> StepKind {
        StepKind::RowsDistinct
    }

    #[instrument(skip(self, step, table), fields(step.index = step.index(), step.target = %step.target()))]
    async fn evaluate(&self, step: &ValidationStep, table: &TableHandle) -> Result<RawResult> {
        let columns: Vec<String> = match step.target() {
            ColumnTarget::None => {
                let schema = table.schema().await?;
                schema
                    .fields()
                    .iter()
                    .map(|field| field.name().clone())
                    .collect()
            }
            target => target.columns().to_vec(),
        };
        if columns.is_empty() {
            return Err(GuardError::evaluation(
                step.index(),
                "rows_distinct requires at least one column",
            ));
        }
        let group_by = columns
            .iter()
            .map(|column| SqlSecurity::quote_identifier(column))
            .collect::<Result<Vec<_>>>()
            .for_step(step.index())?
            .join(", ");
        let table_name = table.quoted_name().for_step(step.index())?;

        let sql = format!(
            "SELECT COALESCE(SUM(cnt), 0) AS n, \
                    COALESCE(SUM(CASE WHEN cnt > 1 THEN cnt ELSE 0 END), 0) AS n_fail \
             FROM (SELECT COUNT(*) AS cnt FROM {table_name} GROUP BY {group_by}) AS grouped"
        );
        let batches = table.collect(&sql).await?;
        let n = scalar_count(&batches, 0, step.index())?;
        let n_fail = scalar_count(&batches, 1, step.index())?;
        Ok(RawResult::aggregate(n, n_fail))
    }
}
