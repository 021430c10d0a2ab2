//! Evaluator for `col_vals_regex` steps.

use crate::core::step::{StepKind, StepParams, ValidationStep};
use crate::core::tally::{RawResult, RowStatus};
use crate::error::{ErrorContext, GuardError, Result};
use crate::evaluators::{quoted_single_column, StepEvaluator};
use crate::sources::TableHandle;
use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use async_trait::async_trait;
use regex::Regex;
use tracing::instrument;

/// Checks that column values match a regular expression.
///
/// This evaluator materializes the column and classifies row by row, the
/// per-row path of the evaluator boundary: nulls are NA, matches pass,
/// everything else fails. Intended for in-memory and modest tables; a
/// database-backed deployment would register a custom evaluator that pushes
/// the pattern down to the backend instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexMatchEvaluator;

#[async_trait]
impl StepEvaluator for RegexMatchEvaluator {
    fn kind(&self) -> StepKind {
        StepKind::ColValsRegex
    }

    #[instrument(skip(self, step, table), fields(step.index = step.index(), step.target = %step.target()))]
    async fn evaluate(&self, step: &ValidationStep, table: &TableHandle) -> Result<RawResult> {
        let StepParams::Pattern { pattern } = step.params() else {
            return Err(GuardError::evaluation(
                step.index(),
                "col_vals_regex requires a pattern parameter",
            ));
        };
        let regex = Regex::new(pattern)
            .map_err(|e| GuardError::evaluation(step.index(), format!("invalid pattern: {e}")))?;

        let column = quoted_single_column(step)?;
        let table_name = table.quoted_name().for_step(step.index())?;
        let batches = table
            .collect(&format!("SELECT {column} FROM {table_name}"))
            .await?;

        let mut statuses = Vec::new();
        for batch in &batches {
            // Cast absorbs Utf8View/LargeUtf8 backends; non-string columns
            // are a type mismatch for this rule.
            let array = cast(batch.column(0), &DataType::Utf8).map_err(|_| {
                GuardError::evaluation(
                    step.index(),
                    format!("column {column} is not castable to a string type"),
                )
            })?;
            let array = array
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| {
                    GuardError::evaluation(step.index(), "cast did not yield a string array")
                })?;
            for row in 0..array.len() {
                let status = if array.is_null(row) {
                    RowStatus::Na
                } else if regex.is_match(array.value(row)) {
                    RowStatus::Pass
                } else {
                    RowStatus::Fail
                };
                statuses.push(status);
            }
        }
        Ok(RawResult::PerRow(statuses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::step::ColumnTarget;
    use arrow::array::StringArray;
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    async fn email_table() -> TableHandle {
        let schema = Arc::new(Schema::new(vec![Field::new(
            "email",
            DataType::Utf8,
            true,
        )]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(StringArray::from(vec![
                Some("a@example.com"),
                Some("not-an-email"),
                None,
                Some("b@example.com"),
            ]))],
        )
        .expect("batch is valid");
        TableHandle::from_batch("data", batch).await.unwrap()
    }

    fn step(pattern: &str) -> ValidationStep {
        ValidationStep::new(
            StepKind::ColValsRegex,
            ColumnTarget::Column("email".into()),
            StepParams::Pattern {
                pattern: pattern.into(),
            },
        )
    }

    #[tokio::test]
    async fn test_per_row_statuses() {
        let raw = RegexMatchEvaluator
            .evaluate(&step(r"^[^@]+@[^@]+$"), &email_table().await)
            .await
            .unwrap();
        assert_eq!(
            raw,
            RawResult::PerRow(vec![
                RowStatus::Pass,
                RowStatus::Fail,
                RowStatus::Na,
                RowStatus::Pass,
            ])
        );
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_evaluation_error() {
        let err = RegexMatchEvaluator
            .evaluate(&step(r"(unclosed"), &email_table().await)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid pattern"));
    }
}
