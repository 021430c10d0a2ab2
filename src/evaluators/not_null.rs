//! Evaluator for `col_vals_not_null` steps.

use crate::core::step::{StepKind, ValidationStep};
use crate::core::tally::{NaPolicy, RawResult, RowCounts};
use crate::error::{ErrorContext, Result};
use crate::evaluators::{quoted_single_column, scalar_count, StepEvaluator};
use crate::sources::TableHandle;
use async_trait::async_trait;
use tracing::instrument;

/// Checks that column values are non-null.
///
/// This is the step kind whose contract defines NA as failing: a null value
/// is the failure being tested for, so nulls land in `n_fail`, not `n_na`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotNullEvaluator;

#[async_trait]
impl StepEvaluator for NotNullEvaluator {
    fn kind(&self) -> StepKind {
        StepKind::ColValsNotNull
    }

    fn na_policy(&self) -> NaPolicy {
        NaPolicy::Fail
    }

    #[instrument(skip(self, step, table), fields(step.index = step.index(), step.target = %step.target()))]
    async fn evaluate(&self, step: &ValidationStep, table: &TableHandle) -> Result<RawResult> {
        let column = quoted_single_column(step)?;
        let table_name = table.quoted_name().for_step(step.index())?;
        // COUNT(col) skips nulls, COUNT(*) does not.
        let sql =
            format!("SELECT COUNT(*) AS n, COUNT({column}) AS n_pass FROM {table_name}");
        let batches = table.collect(&sql).await?;
        let n = scalar_count(&batches, 0, step.index())?;
        let n_pass = scalar_count(&batches, 1, step.index())?;
        Ok(RawResult::Aggregate(RowCounts {
            n,
            n_pass,
            n_fail: n - n_pass,
            n_na: 0,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::step::{ColumnTarget, StepParams};
    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_nulls_count_as_failures() {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, true)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Int64Array::from(vec![
                Some(1),
                None,
                Some(3),
                None,
            ]))],
        )
        .expect("batch is valid");
        let table = TableHandle::from_batch("data", batch).await.unwrap();

        let step = ValidationStep::new(
            StepKind::ColValsNotNull,
            ColumnTarget::Column("id".into()),
            StepParams::None,
        );
        let raw = NotNullEvaluator.evaluate(&step, &table).await.unwrap();
        let RawResult::Aggregate(counts) = raw else {
            panic!("expected aggregate counts");
        };
        assert_eq!(counts.n, 4);
        assert_eq!(counts.n_pass, 2);
        assert_eq!(counts.n_fail, 2);
        assert_eq!(counts.n_na, 0);
        assert_eq!(counts.f_failed(), 0.5);
    }
}
