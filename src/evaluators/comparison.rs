//! Evaluators for scalar comparison and range steps.
//!
//! Both evaluators aggregate server-side with a single `COUNT(CASE …)`
//! query, so they work unchanged against in-memory and database-backed
//! tables. Rows where the predicate is undecidable (null inputs) fall out of
//! both counted branches and are reported as NA.

use crate::core::step::{StepKind, StepParams, ValidationStep};
use crate::core::tally::{RawResult, RowCounts};
use crate::error::{ErrorContext, GuardError, Result};
use crate::evaluators::{quoted_single_column, scalar_count, StepEvaluator};
use crate::sources::TableHandle;
use async_trait::async_trait;
use tracing::instrument;

async fn counts_for_predicate(
    step: &ValidationStep,
    table: &TableHandle,
    predicate: &str,
) -> Result<RawResult> {
    let table_name = table.quoted_name().for_step(step.index())?;
    let sql = format!(
        "SELECT COUNT(*) AS n, \
                COUNT(CASE WHEN {predicate} THEN 1 END) AS n_pass, \
                COUNT(CASE WHEN NOT ({predicate}) THEN 1 END) AS n_fail \
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

/// Checks that column values satisfy a scalar comparison
/// (`col > 100.0`, `col <> 0.0`, …).
#[derive(Debug, Clone, Copy, Default)]
pub struct CompareEvaluator;

#[async_trait]
impl StepEvaluator for CompareEvaluator {
    fn kind(&self) -> StepKind {
        StepKind::ColValsCompare
    }

    #[instrument(skip(self, step, table), fields(step.index = step.index(), step.target = %step.target()))]
    async fn evaluate(&self, step: &ValidationStep, table: &TableHandle) -> Result<RawResult> {
        let StepParams::Compare { op, value } = step.params() else {
            return Err(GuardError::evaluation(
                step.index(),
                "col_vals_compare requires comparison parameters",
            ));
        };
        if !value.is_finite() {
            return Err(GuardError::evaluation(
                step.index(),
                format!("comparison value must be finite, got {value}"),
            ));
        }
        let column = quoted_single_column(step)?;
        let predicate = format!("{column} {} {value}", op.sql());
        counts_for_predicate(step, table, &predicate).await
    }
}

/// Checks that column values fall in an inclusive range.
#[derive(Debug, Clone, Copy, Default)]
pub struct BetweenEvaluator;

#[async_trait]
impl StepEvaluator for BetweenEvaluator {
    fn kind(&self) -> StepKind {
        StepKind::ColValsBetween
    }

    #[instrument(skip(self, step, table), fields(step.index = step.index(), step.target = %step.target()))]
    async fn evaluate(&self, step: &ValidationStep, table: &TableHandle) -> Result<RawResult> {
        let StepParams::Between { lower, upper } = step.params() else {
            return Err(GuardError::evaluation(
                step.index(),
                "col_vals_between requires range parameters",
            ));
        };
        if !(lower.is_finite() && upper.is_finite()) {
            return Err(GuardError::evaluation(
                step.index(),
                "range bounds must be finite",
            ));
        }
        let column = quoted_single_column(step)?;
        let predicate = format!("{column} BETWEEN {lower} AND {upper}");
        counts_for_predicate(step, table, &predicate).await
    }
}
