//! Evaluator for `col_exists` steps.

use crate::core::step::{StepKind, ValidationStep};
use crate::core::tally::RawResult;
use crate::error::{GuardError, Result};
use crate::evaluators::StepEvaluator;
use crate::sources::TableHandle;
use async_trait::async_trait;
use tracing::instrument;

/// Checks that the target column is present in the table schema.
///
/// This is a table-level check with a single test unit: the tally is one
/// passing row when the column exists, one failing row when it does not.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColExistsEvaluator;

#[async_trait]
impl StepEvaluator for ColExistsEvaluator {
    fn kind(&self) -> StepKind {
        StepKind::ColExists
    }

    #[instrument(skip(self, step, table), fields(step.index = step.index(), step.target = %step.target()))]
    async fn evaluate(&self, step: &ValidationStep, table: &TableHandle) -> Result<RawResult> {
        let column = step.target().single().ok_or_else(|| {
            GuardError::evaluation(step.index(), "col_exists requires a single target column")
        })?;
        let schema = table.schema().await?;
        let exists = schema.field_with_name(column).is_ok();
        Ok(RawResult::aggregate(1, u64::from(!exists)))
    }
}
