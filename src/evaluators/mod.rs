//! The table-evaluator boundary.
//!
//! A [`StepEvaluator`] executes one step kind's predicate against the bound
//! table and returns a [`RawResult`]: per-row statuses when the rows are
//! cheap to materialize, or counts pre-aggregated by the backend (the only
//! viable shape for large remote tables). Evaluators must be deterministic
//! for a fixed table snapshot and must never mutate the table.
//!
//! The orchestrator dispatches through an [`EvaluatorRegistry`] keyed by
//! [`StepKind`], so new step kinds are added by registering an evaluator,
//! never by modifying the orchestrator.

use crate::core::step::{StepKind, ValidationStep};
use crate::core::tally::{NaPolicy, RawResult};
use crate::error::{ErrorContext, GuardError, Result};
use crate::sources::TableHandle;
use arrow::array::{Array, Int64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

mod column_exists;
mod comparison;
mod in_set;
mod not_null;
mod regex_match;
mod rows_distinct;

pub use column_exists::ColExistsEvaluator;
pub use comparison::{BetweenEvaluator, CompareEvaluator};
pub use in_set::InSetEvaluator;
pub use not_null::NotNullEvaluator;
pub use regex_match::RegexMatchEvaluator;
pub use rows_distinct::RowsDistinctEvaluator;

/// Executes one step kind's predicate against a bound table.
#[async_trait]
pub trait StepEvaluator: Debug + Send + Sync {
    /// The step kind this evaluator handles; used as the registry key.
    fn kind(&self) -> StepKind;

    /// How this step kind treats undecidable (NA) rows. Part of the step
    /// type's contract.
    fn na_policy(&self) -> NaPolicy {
        NaPolicy::Exclude
    }

    /// Evaluates the step's predicate against the bound table.
    ///
    /// Fails with [`GuardError::Evaluation`] when the rule cannot be applied
    /// (missing column, type mismatch, backend failure). Such an error is
    /// caught by the orchestrator and recorded on the step's tally; it never
    /// aborts the run.
    async fn evaluate(&self, step: &ValidationStep, table: &TableHandle) -> Result<RawResult>;
}

/// A registry of step evaluators keyed by step kind.
#[derive(Debug, Clone)]
pub struct EvaluatorRegistry {
    evaluators: HashMap<StepKind, Arc<dyn StepEvaluator>>,
}

impl EvaluatorRegistry {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            evaluators: HashMap::new(),
        }
    }

    /// Creates a registry with every built-in evaluator registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ColExistsEvaluator));
        registry.register(Arc::new(CompareEvaluator));
        registry.register(Arc::new(BetweenEvaluator));
        registry.register(Arc::new(RegexMatchEvaluator));
        registry.register(Arc::new(InSetEvaluator));
        registry.register(Arc::new(NotNullEvaluator));
        registry.register(Arc::new(RowsDistinctEvaluator));
        registry
    }

    /// Registers an evaluator under its declared kind, replacing any
    /// previous registration for that kind.
    pub fn register(&mut self, evaluator: Arc<dyn StepEvaluator>) {
        self.evaluators.insert(evaluator.kind(), evaluator);
    }

    /// Looks up the evaluator for a step kind.
    pub fn get(&self, kind: &StepKind) -> Option<&Arc<dyn StepEvaluator>> {
        self.evaluators.get(kind)
    }

    /// Returns true when an evaluator is registered for the kind.
    pub fn contains(&self, kind: &StepKind) -> bool {
        self.evaluators.contains_key(kind)
    }
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Extracts a non-negative integer from the first row of an aggregate query
/// result, casting to `Int64` to absorb backend-specific count types.
pub(crate) fn scalar_count(
    batches: &[RecordBatch],
    column: usize,
    step_index: usize,
) -> Result<u64> {
    let batch = batches
        .iter()
        .find(|batch| batch.num_rows() > 0)
        .ok_or_else(|| GuardError::evaluation(step_index, "aggregate query returned no rows"))?;
    let array = cast(batch.column(column), &DataType::Int64)?;
    let array = array
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| GuardError::evaluation(step_index, "aggregate column is not integral"))?;
    if array.is_null(0) {
        return Ok(0);
    }
    let value = array.value(0);
    u64::try_from(value)
        .map_err(|_| GuardError::evaluation(step_index, format!("negative aggregate: {value}")))
}

/// Validates and quotes the single target column of a step.
pub(crate) fn quoted_single_column(step: &ValidationStep) -> Result<String> {
    let column = step.target().single().ok_or_else(|| {
        GuardError::evaluation(
            step.index(),
            format!("step kind {} requires a single target column", step.kind()),
        )
    })?;
    crate::security::SqlSecurity::quote_identifier(column).for_step(step.index())
}
