//! Validation plans and the run orchestrator.
//!
//! A [`ValidationPlan`] owns an ordered, immutable list of steps, a
//! plan-wide severity policy, the per-level action lists, and the evaluator
//! registry. [`ValidationPlan::run`] executes the steps strictly in
//! ascending index order against a bound table, isolating each step: an
//! evaluator error becomes an evaluation-failed tally, an action error is
//! recorded on the outcome, and the run always completes with one
//! [`StepOutcome`] per active step.

use crate::core::action::{ActionContext, ActionSet};
use crate::core::outcome::{RunResult, StepOutcome};
use crate::core::severity::{classify, SeverityPolicy};
use crate::core::step::{
    ColumnTarget, CompareOp, SetValue, StepKind, StepParams, ValidationStep,
};
use crate::core::tally::Tally;
use crate::error::{GuardError, Result};
use crate::evaluators::EvaluatorRegistry;
use crate::security::SqlSecurity;
use crate::sources::TableHandle;
use chrono::Utc;
use regex::Regex;
use tracing::{debug, info, instrument, trace, warn};

/// Per-step execution state. Every active step walks
/// `Pending → Evaluating → (Tallied | EvalFailed) → Classified → Dispatched
/// → Done`; `Done` is always reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepState {
    Pending,
    Evaluating,
    Tallied,
    EvalFailed,
    Classified,
    Dispatched,
    Done,
}

impl StepState {
    fn advance(self, next: StepState, step_index: usize) -> StepState {
        let legal = matches!(
            (self, next),
            (StepState::Pending, StepState::Evaluating)
                | (StepState::Evaluating, StepState::Tallied)
                | (StepState::Evaluating, StepState::EvalFailed)
                | (StepState::Tallied, StepState::Classified)
                | (StepState::EvalFailed, StepState::Classified)
                | (StepState::Classified, StepState::Dispatched)
                | (StepState::Dispatched, StepState::Done)
        );
        debug_assert!(legal, "illegal transition {self:?} -> {next:?}");
        trace!(step.index = step_index, from = ?self, to = ?next, "Step state transition");
        next
    }
}

/// An immutable, ordered validation plan.
#[derive(Debug, Clone)]
pub struct ValidationPlan {
    name: String,
    steps: Vec<ValidationStep>,
    policy: SeverityPolicy,
    actions: ActionSet,
    registry: EvaluatorRegistry,
}

impl ValidationPlan {
    /// Creates a new builder for constructing a validation plan.
    pub fn builder(name: impl Into<String>) -> ValidationPlanBuilder {
        ValidationPlanBuilder::new(name)
    }

    /// Returns the plan name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the plan's steps, in index order.
    pub fn steps(&self) -> &[ValidationStep] {
        &self.steps
    }

    /// Returns the plan-wide severity policy.
    pub fn policy(&self) -> &SeverityPolicy {
        &self.policy
    }

    /// Runs every active step against the bound table, in ascending index
    /// order, and returns the accumulated result.
    ///
    /// The run never fails: per-step evaluation errors and action failures
    /// are recorded in the corresponding [`StepOutcome`]. Callers inspect
    /// the result rather than catching errors.
    #[instrument(skip(self, table), fields(
        plan.name = %self.name,
        plan.steps = self.steps.len(),
        table.name = %table.table_name()
    ))]
    pub async fn run(&self, table: &TableHandle) -> RunResult {
        info!(
            plan.name = %self.name,
            plan.steps = self.steps.len(),
            table.name = %table.table_name(),
            "Starting validation run"
        );
        let started_at = Utc::now();
        let mut outcomes = Vec::new();

        for step in &self.steps {
            if !step.is_active() {
                debug!(step.index = step.index(), "Skipping inactive step");
                continue;
            }
            outcomes.push(self.run_step(step, table).await);
        }

        let completed_at = Utc::now();
        let result = RunResult {
            plan_name: self.name.clone(),
            started_at,
            completed_at,
            outcomes,
        };
        info!(
            plan.name = %self.name,
            run.outcomes = result.outcomes.len(),
            run.passed = result.is_pass(),
            run.evaluation_failures = result.any_evaluation_failed(),
            "Validation run completed"
        );
        result
    }

    async fn run_step(&self, step: &ValidationStep, table: &TableHandle) -> StepOutcome {
        let mut state = StepState::Pending;
        state = state.advance(StepState::Evaluating, step.index());

        let effective_policy = match step.threshold_overrides() {
            Some(overrides) => self.policy.merged_with(overrides),
            None => self.policy.clone(),
        };

        let tally = match self.registry.get(step.kind()) {
            None => Tally::evaluation_failed(format!(
                "no evaluator registered for step kind {}",
                step.kind()
            )),
            Some(evaluator) => match evaluator.evaluate(step, table).await {
                Ok(raw) => Tally::from_raw(raw, evaluator.na_policy()),
                Err(e) => {
                    warn!(
                        step.index = step.index(),
                        step.kind = %step.kind(),
                        error = %e,
                        "Step evaluation failed"
                    );
                    Tally::evaluation_failed(e.to_string())
                }
            },
        };
        let evaluation_failed = tally.is_evaluation_failed();
        state = state.advance(
            if evaluation_failed {
                StepState::EvalFailed
            } else {
                StepState::Tallied
            },
            step.index(),
        );

        let classification = classify(&tally, &effective_policy);
        state = state.advance(StepState::Classified, step.index());
        debug!(
            step.index = step.index(),
            step.kind = %step.kind(),
            tally = ?tally,
            breached = ?classification.breached,
            highest = ?classification.highest,
            "Step classified"
        );

        let action_failures = match classification.highest {
            Some(level) => {
                let cx = ActionContext::new(
                    step,
                    &tally,
                    level,
                    effective_policy.threshold(level).copied(),
                    classification.fallback,
                );
                self.actions.dispatch(&cx)
            }
            None => Vec::new(),
        };
        state = state.advance(StepState::Dispatched, step.index());

        let outcome = StepOutcome {
            step_index: step.index(),
            step_kind: step.kind().clone(),
            target: step.target().clone(),
            label: step.label().map(str::to_string),
            tally,
            breached: classification.breached,
            highest: classification.highest,
            evaluation_failed,
            action_failures,
        };
        let state = state.advance(StepState::Done, step.index());
        debug_assert_eq!(state, StepState::Done);
        outcome
    }
}

/// Builder for [`ValidationPlan`] instances.
///
/// Step adders append one step each; [`inactive`](Self::inactive),
/// [`step_label`](Self::step_label), and
/// [`step_thresholds`](Self::step_thresholds) modify the step added last.
/// [`build`](Self::build) validates the whole plan and fails fast with
/// [`GuardError::Configuration`] on a malformed specification.
///
/// # Examples
///
/// ```rust
/// use frame_guard::core::{SeverityPolicy, ValidationPlan};
///
/// # fn example() -> frame_guard::error::Result<()> {
/// let plan = ValidationPlan::builder("orders")
///     .col_exists("order_id")
///     .col_vals_not_null("order_id")
///     .col_vals_gt("amount", 0.0)
///     .col_vals_regex("email", r"^[^@]+@[^@]+$")
///     .thresholds(SeverityPolicy::new().warn_fraction(0.1).stop_fraction(0.25))
///     .build()?;
/// assert_eq!(plan.steps().len(), 4);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ValidationPlanBuilder {
    name: String,
    steps: Vec<ValidationStep>,
    policy: SeverityPolicy,
    actions: ActionSet,
    registry: EvaluatorRegistry,
}

impl ValidationPlanBuilder {
    /// Creates a builder with an empty step list, no thresholds armed, no
    /// actions, and the built-in evaluator registry.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            policy: SeverityPolicy::new(),
            actions: ActionSet::new(),
            registry: EvaluatorRegistry::with_builtins(),
        }
    }

    /// Appends a pre-built step.
    pub fn step(mut self, step: ValidationStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Appends a `col_exists` step.
    pub fn col_exists(self, column: impl Into<String>) -> Self {
        self.step(ValidationStep::new(
            StepKind::ColExists,
            ColumnTarget::Column(column.into()),
            StepParams::None,
        ))
    }

    fn compare(self, column: impl Into<String>, op: CompareOp, value: f64) -> Self {
        self.step(ValidationStep::new(
            StepKind::ColValsCompare,
            ColumnTarget::Column(column.into()),
            StepParams::Compare { op, value },
        ))
    }

    /// Appends a step requiring values greater than `value`.
    pub fn col_vals_gt(self, column: impl Into<String>, value: f64) -> Self {
        self.compare(column, CompareOp::Gt, value)
    }

    /// Appends a step requiring values greater than or equal to `value`.
    pub fn col_vals_ge(self, column: impl Into<String>, value: f64) -> Self {
        self.compare(column, CompareOp::Ge, value)
    }

    /// Appends a step requiring values less than `value`.
    pub fn col_vals_lt(self, column: impl Into<String>, value: f64) -> Self {
        self.compare(column, CompareOp::Lt, value)
    }

    /// Appends a step requiring values less than or equal to `value`.
    pub fn col_vals_le(self, column: impl Into<String>, value: f64) -> Self {
        self.compare(column, CompareOp::Le, value)
    }

    /// Appends a step requiring values equal to `value`.
    pub fn col_vals_eq(self, column: impl Into<String>, value: f64) -> Self {
        self.compare(column, CompareOp::Eq, value)
    }

    /// Appends a step requiring values not equal to `value`.
    pub fn col_vals_ne(self, column: impl Into<String>, value: f64) -> Self {
        self.compare(column, CompareOp::Ne, value)
    }

    /// Appends a step requiring values in the inclusive range
    /// `[lower, upper]`.
    pub fn col_vals_between(self, column: impl Into<String>, lower: f64, upper: f64) -> Self {
        self.step(ValidationStep::new(
            StepKind::ColValsBetween,
            ColumnTarget::Column(column.into()),
            StepParams::Between { lower, upper },
        ))
    }

    /// Appends a step requiring values to match a regular expression.
    pub fn col_vals_regex(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.step(ValidationStep::new(
            StepKind::ColValsRegex,
            ColumnTarget::Column(column.into()),
            StepParams::Pattern {
                pattern: pattern.into(),
            },
        ))
    }

    /// Appends a step requiring values to be members of the allowed set.
    pub fn col_vals_in_set<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SetValue>,
    {
        self.step(ValidationStep::new(
            StepKind::ColValsInSet,
            ColumnTarget::Column(column.into()),
            StepParams::InSet {
                values: values.into_iter().map(Into::into).collect(),
            },
        ))
    }

    /// Appends a step requiring values to be non-null.
    pub fn col_vals_not_null(self, column: impl Into<String>) -> Self {
        self.step(ValidationStep::new(
            StepKind::ColValsNotNull,
            ColumnTarget::Column(column.into()),
            StepParams::None,
        ))
    }

    /// Appends a step requiring whole rows to be distinct.
    pub fn rows_distinct(self) -> Self {
        self.step(ValidationStep::new(
            StepKind::RowsDistinct,
            ColumnTarget::None,
            StepParams::None,
        ))
    }

    /// Appends a step requiring rows to be distinct over the given columns.
    pub fn rows_distinct_over<I, S>(self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.step(ValidationStep::new(
            StepKind::RowsDistinct,
            ColumnTarget::Columns(columns.into_iter().map(Into::into).collect()),
            StepParams::None,
        ))
    }

    fn last_step_mut(&mut self) -> &mut ValidationStep {
        self.steps
            .last_mut()
            .expect("a step adder must be called before step modifiers")
    }

    /// Marks the step added last as inactive.
    ///
    /// # Panics
    ///
    /// Panics when no step has been added yet.
    pub fn inactive(mut self) -> Self {
        self.last_step_mut().set_active(false);
        self
    }

    /// Attaches a label to the step added last.
    ///
    /// # Panics
    ///
    /// Panics when no step has been added yet.
    pub fn step_label(mut self, label: impl Into<String>) -> Self {
        self.last_step_mut().set_label(label.into());
        self
    }

    /// Attaches severity threshold overrides to the step added last.
    ///
    /// # Panics
    ///
    /// Panics when no step has been added yet.
    pub fn step_thresholds(mut self, overrides: SeverityPolicy) -> Self {
        self.last_step_mut().set_threshold_overrides(overrides);
        self
    }

    /// Sets the plan-wide severity policy.
    pub fn thresholds(mut self, policy: SeverityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the per-level action lists.
    pub fn actions(mut self, actions: ActionSet) -> Self {
        self.actions = actions;
        self
    }

    /// Replaces the evaluator registry, e.g. to add custom step kinds.
    pub fn registry(mut self, registry: EvaluatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    fn validate_step(&self, position: usize, step: &ValidationStep) -> Result<()> {
        let describe = |message: String| {
            GuardError::Configuration(format!("step {}: {message}", position + 1))
        };

        if !self.registry.contains(step.kind()) {
            return Err(describe(format!(
                "no evaluator registered for step kind {}",
                step.kind()
            )));
        }
        if matches!(step.target(), ColumnTarget::Columns(columns) if columns.is_empty()) {
            return Err(describe("column list must not be empty".to_string()));
        }
        for column in step.target().columns() {
            SqlSecurity::quote_identifier(column)
                .map_err(|e| describe(e.to_string()))?;
        }
        if let Some(overrides) = step.threshold_overrides() {
            overrides.validate().map_err(|e| describe(e.to_string()))?;
        }
        match step.params() {
            StepParams::Pattern { pattern } => {
                Regex::new(pattern)
                    .map_err(|e| describe(format!("invalid regex pattern: {e}")))?;
            }
            StepParams::Between { lower, upper } => {
                if !(lower.is_finite() && upper.is_finite()) || lower > upper {
                    return Err(describe(format!(
                        "invalid range [{lower}, {upper}]"
                    )));
                }
            }
            StepParams::Compare { value, .. } => {
                if !value.is_finite() {
                    return Err(describe(format!(
                        "comparison value must be finite, got {value}"
                    )));
                }
            }
            StepParams::InSet { values } => {
                if values.is_empty() {
                    return Err(describe("allowed set must not be empty".to_string()));
                }
                for value in values {
                    if let SetValue::Number(number) = value {
                        if !number.is_finite() {
                            return Err(describe(format!(
                                "set members must be finite, got {number}"
                            )));
                        }
                    }
                }
            }
            StepParams::None => {}
        }
        Ok(())
    }

    /// Validates the plan and assigns 1-based step indexes.
    ///
    /// Fails with [`GuardError::Configuration`] when the step list is empty,
    /// a threshold fraction is out of range, a step's parameters are
    /// malformed, or a step kind has no registered evaluator.
    pub fn build(mut self) -> Result<ValidationPlan> {
        if self.steps.is_empty() {
            return Err(GuardError::Configuration(
                "a validation plan requires at least one step".to_string(),
            ));
        }
        self.policy.validate()?;
        for (position, step) in self.steps.iter().enumerate() {
            self.validate_step(position, step)?;
        }
        for (position, step) in self.steps.iter_mut().enumerate() {
            step.assign_index(position + 1);
        }
        Ok(ValidationPlan {
            name: self.name,
            steps: self.steps,
            policy: self.policy,
            actions: self.actions,
            registry: self.registry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_assigns_indexes() {
        let plan = ValidationPlan::builder("p")
            .col_exists("a")
            .col_vals_gt("b", 1.0)
            .rows_distinct()
            .build()
            .unwrap();
        let indexes: Vec<usize> = plan.steps().iter().map(|s| s.index()).collect();
        assert_eq!(indexes, vec![1, 2, 3]);
    }

    #[test]
    fn test_build_rejects_empty_plan() {
        let err = ValidationPlan::builder("p").build().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_build_rejects_bad_fraction() {
        let err = ValidationPlan::builder("p")
            .col_exists("a")
            .thresholds(SeverityPolicy::new().warn_fraction(0.0))
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_build_rejects_bad_regex() {
        let err = ValidationPlan::builder("p")
            .col_vals_regex("a", "(unclosed")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("invalid regex pattern"));
    }

    #[test]
    fn test_build_rejects_inverted_range() {
        let err = ValidationPlan::builder("p")
            .col_vals_between("a", 10.0, 1.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("invalid range"));
    }

    #[test]
    fn test_build_rejects_hostile_column_name() {
        let err = ValidationPlan::builder("p")
            .col_exists("a; DROP TABLE data")
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_build_rejects_empty_column_list() {
        let err = ValidationPlan::builder("p")
            .rows_distinct_over(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("column list must not be empty"));
    }

    #[test]
    fn test_build_rejects_non_finite_set_member() {
        let err = ValidationPlan::builder("p")
            .col_vals_in_set("a", [1.0, f64::NAN])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("set members must be finite"));
    }

    #[test]
    fn test_build_rejects_unregistered_kind() {
        let err = ValidationPlan::builder("p")
            .step(ValidationStep::new(
                StepKind::Custom("no_such_rule".into()),
                ColumnTarget::None,
                StepParams::None,
            ))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("no evaluator registered"));
    }

    #[test]
    fn test_step_modifiers_apply_to_last_step() {
        let plan = ValidationPlan::builder("p")
            .col_exists("a")
            .col_vals_gt("b", 1.0)
            .inactive()
            .step_label("b must be positive")
            .step_thresholds(SeverityPolicy::new().stop_fraction(0.5))
            .build()
            .unwrap();
        let first = &plan.steps()[0];
        let second = &plan.steps()[1];
        assert!(first.is_active());
        assert!(first.label().is_none());
        assert!(!second.is_active());
        assert_eq!(second.label(), Some("b must be positive"));
        assert!(second.threshold_overrides().is_some());
    }

    #[test]
    fn test_step_state_machine_paths() {
        let s = StepState::Pending;
        let s = s.advance(StepState::Evaluating, 1);
        let s = s.advance(StepState::Tallied, 1);
        let s = s.advance(StepState::Classified, 1);
        let s = s.advance(StepState::Dispatched, 1);
        assert_eq!(s.advance(StepState::Done, 1), StepState::Done);

        let failed = StepState::Evaluating.advance(StepState::EvalFailed, 2);
        assert_eq!(
            failed.advance(StepState::Classified, 2),
            StepState::Classified
        );
    }
}
