//! Per-step outcomes and the run-level result set.

use crate::core::action::ActionFailure;
use crate::core::severity::Severity;
use crate::core::step::{ColumnTarget, StepKind};
use crate::core::tally::Tally;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// The immutable record of one executed step.
///
/// Produced once per active step per run and never mutated afterwards;
/// re-running a plan produces new outcomes, not updates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    /// 1-based index of the originating step.
    pub step_index: usize,
    /// The step's kind tag.
    pub step_kind: StepKind,
    /// The step's column target.
    pub target: ColumnTarget,
    /// The step's label, if one was set.
    pub label: Option<String>,
    /// The step's tally.
    pub tally: Tally,
    /// Breached levels in ascending severity order. Empty when the
    /// evaluation failed (the fallback level is in `highest` instead).
    pub breached: Vec<Severity>,
    /// The single level whose actions fired, if any.
    pub highest: Option<Severity>,
    /// True when the evaluator raised instead of producing counts.
    pub evaluation_failed: bool,
    /// Failures of actions invoked for this step.
    pub action_failures: Vec<ActionFailure>,
}

impl StepOutcome {
    /// Returns true when the step passed cleanly: evaluation succeeded and
    /// no level was breached.
    pub fn is_pass(&self) -> bool {
        !self.evaluation_failed && self.highest.is_none()
    }

    /// Returns true when the given level was breached by this step.
    pub fn breached(&self, level: Severity) -> bool {
        self.breached.contains(&level)
    }
}

/// The ordered result set of one validation run.
///
/// Contains one [`StepOutcome`] per active step in step-index order. Owned
/// by the caller as an immutable snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    /// The name of the plan that produced this result.
    pub plan_name: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run completed.
    pub completed_at: DateTime<Utc>,
    /// One outcome per active step, in step-index order.
    pub outcomes: Vec<StepOutcome>,
}

impl RunResult {
    /// Returns true when every active step passed cleanly.
    pub fn is_pass(&self) -> bool {
        self.outcomes.iter().all(StepOutcome::is_pass)
    }

    /// Returns true when any step breached the given level, or fired it as
    /// the evaluation-failure fallback.
    pub fn any_breached(&self, level: Severity) -> bool {
        self.outcomes
            .iter()
            .any(|outcome| outcome.breached(level) || outcome.highest == Some(level))
    }

    /// Returns true when any step's evaluation failed.
    pub fn any_evaluation_failed(&self) -> bool {
        self.outcomes.iter().any(|outcome| outcome.evaluation_failed)
    }

    /// Returns the outcome for the given 1-based step index, if that step
    /// was active.
    pub fn outcome(&self, step_index: usize) -> Option<&StepOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.step_index == step_index)
    }
}
