//! Evaluator for `col_vals_in_set` steps.

use crate::core::step::{SetValue, StepKind, StepParams, ValidationStep};
use crate::core::tally::{RawResult, RowCounts};
use crate::error::{ErrorContext, GuardError, Result};
use crate::evaluators::{quoted_single_column, scalar_count, StepEvaluator};
use crate::security::SqlSecurity;
use crate::sources::TableHandle;
use async_trait::async_trait;
use tracing::instrument;

/// Checks that column values are members of an allowed set.
///
/// Aggregates server-side with an `IN` predicate; null values are
/// undecidable and reported as NA.
#[derive(Debug, Clone, Copy, Default)]
pub struct InSetEvaluator;

fn render_member(value: &SetValue) -> Result<String> {
    match value {
        SetValue::Text(text) => Ok(SqlSecurity::escape_literal(text)),
        SetValue::Number(number) if number.is_finite() => Ok(number.to_string()),
        SetValue::Number(number) => Err(GuardError::Configuration(format!(
            "set members must be finite, got {number}"
        ))),
    }
}

#[async_trait]
impl StepEvaluator for InSetEvaluator {
    fn kind(&self) -> StepKind {
        StepKind::ColValsInSet
    }

    #[instrument(skip(self, step, table), fields(step.index = step.index(), step.target = %step.target()))]
    async fn evaluate(&self, step: &ValidationStep, table: &TableHandle) -> Result<RawResult> {
        let StepParams::InSet { values } = step.params() else {
            return Err(GuardError::evaluation(
                step.index(),
                "col_vals_in_set requires set parameters",
            ));
        };
        if values.is_empty() {
            return Err(GuardError::evaluation(
                step.index(),
                "allowed set must not be empty",
            ));
        }
        let members = values
            .iter()
            .map(render_member)
            .collect::<Result<Vec<_>>>()
            .for_step(step.index())?
            .join(", ");

        let column = quoted_single_column(step)?;
        let table_name = table.quoted_name().for_step(step.index())?;
        let sql = format!(
            "SELECT COUNT(*) AS n, \
                    COUNT(CASE WHEN {column} IN ({members}) THEN 1 END) AS n_pass, \
                    COUNT(CASE WHEN {column} NOT IN ({members}) THEN 1 END) AS n_fail \
             FROM {table_name}"
        );
        let batches = table.collect(&sql).await?;
        let n = scalar_count(&batches, 0, step.index())?;
        let n_pass = scalar_count(&batches, 1, step.index())?;
        let n_fail = scalar_count(&batches, 2, step.index())?;
        Ok(RawResult::Aggregate(RowCounts {
            n,
            n_pass,
            n_fail,
            n_na: n - n_pass - n_fail,
        }))
    }
}
