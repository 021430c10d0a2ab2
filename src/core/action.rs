//! Actions fired when a severity level is breached.
//!
//! Actions are side-effecting callables the caller attaches per severity
//! level. The dispatch invariant: for each step, only the action list of the
//! single highest breached level is invoked, once, in list order. Lower
//! breached levels are suppressed. A failing action is recorded on the step
//! outcome and never interrupts other actions or later steps.

use crate::core::severity::{Severity, ThresholdSpec};
use crate::core::step::{ColumnTarget, StepKind, ValidationStep};
use crate::core::tally::Tally;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use tracing::{error, warn};

/// The read-only snapshot handed to each invoked action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionContext {
    /// 1-based index of the step that breached.
    pub step_index: usize,
    /// The step's kind tag.
    pub step_kind: StepKind,
    /// The step's column target.
    pub target: ColumnTarget,
    /// The step's label, if one was set.
    pub label: Option<String>,
    /// Total rows evaluated; `None` when evaluation failed.
    pub n: Option<u64>,
    /// Passing rows; `None` when evaluation failed.
    pub n_pass: Option<u64>,
    /// Failing rows; `None` when evaluation failed.
    pub n_fail: Option<u64>,
    /// Undecidable rows; `None` when evaluation failed.
    pub n_na: Option<u64>,
    /// Failing fraction; `None` when evaluation failed.
    pub f_failed: Option<f64>,
    /// The severity level whose actions are firing.
    pub level: Severity,
    /// The threshold that armed the level.
    pub threshold: Option<ThresholdSpec>,
    /// True when the level fired as the evaluation-failure fallback rather
    /// than through a threshold breach.
    pub fallback: bool,
}

impl ActionContext {
    pub(crate) fn new(
        step: &ValidationStep,
        tally: &Tally,
        level: Severity,
        threshold: Option<ThresholdSpec>,
        fallback: bool,
    ) -> Self {
        let counts = tally.counts();
        Self {
            step_index: step.index(),
            step_kind: step.kind().clone(),
            target: step.target().clone(),
            label: step.label().map(str::to_string),
            n: counts.map(|c| c.n),
            n_pass: counts.map(|c| c.n_pass),
            n_fail: counts.map(|c| c.n_fail),
            n_na: counts.map(|c| c.n_na),
            f_failed: tally.f_failed(),
            level,
            threshold,
            fallback,
        }
    }
}

/// A side-effecting callable invoked when its severity level is the highest
/// breached level of a step.
pub trait Action: Debug + Send + Sync {
    /// Invokes the action with the step's context snapshot.
    fn call(&self, cx: &ActionContext) -> Result<()>;

    /// Returns a name used when recording action failures.
    fn name(&self) -> &str {
        "action"
    }
}

/// A recorded action failure, attached to the step outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionFailure {
    /// The name of the failing action.
    pub action: String,
    /// The failure description.
    pub message: String,
}

/// The per-level action lists for a plan.
#[derive(Debug, Clone, Default)]
pub struct ActionSet {
    warn: Vec<Arc<dyn Action>>,
    stop: Vec<Arc<dyn Action>>,
    notify: Vec<Arc<dyn Action>>,
}

impl ActionSet {
    /// Creates an empty action set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action to the warn-level list.
    pub fn on_warn(mut self, action: Arc<dyn Action>) -> Self {
        self.warn.push(action);
        self
    }

    /// Appends an action to the stop-level list.
    pub fn on_stop(mut self, action: Arc<dyn Action>) -> Self {
        self.stop.push(action);
        self
    }

    /// Appends an action to the notify-level list.
    pub fn on_notify(mut self, action: Arc<dyn Action>) -> Self {
        self.notify.push(action);
        self
    }

    /// Returns the action list for the given level.
    pub fn for_level(&self, level: Severity) -> &[Arc<dyn Action>] {
        match level {
            Severity::Warn => &self.warn,
            Severity::Stop => &self.stop,
            Severity::Notify => &self.notify,
        }
    }

    /// Invokes the action list for `cx.level`, once per action in list
    /// order. Failures are captured and returned, never propagated; one
    /// broken action does not prevent the rest of its list from running.
    pub fn dispatch(&self, cx: &ActionContext) -> Vec<ActionFailure> {
        let mut failures = Vec::new();
        for action in self.for_level(cx.level) {
            if let Err(e) = action.call(cx) {
                warn!(
                    step.index = cx.step_index,
                    action.name = %action.name(),
                    error = %e,
                    "Action failed"
                );
                failures.push(ActionFailure {
                    action: action.name().to_string(),
                    message: e.to_string(),
                });
            }
        }
        failures
    }
}

/// A built-in action that emits a structured tracing event carrying the
/// action context as JSON.
///
/// Warn-level breaches log at `WARN`; stop and notify breaches log at
/// `ERROR`.
#[derive(Debug, Clone, Default)]
pub struct LogAction;

impl Action for LogAction {
    fn call(&self, cx: &ActionContext) -> Result<()> {
        let payload = serde_json::to_string(cx)
            .unwrap_or_else(|e| format!("{{\"serialization_error\":\"{e}\"}}"));
        match cx.level {
            Severity::Warn => warn!(
                step.index = cx.step_index,
                step.kind = %cx.step_kind,
                level = %cx.level,
                context = %payload,
                "Validation threshold breached"
            ),
            Severity::Stop | Severity::Notify => error!(
                step.index = cx.step_index,
                step.kind = %cx.step_kind,
                level = %cx.level,
                context = %payload,
                "Validation threshold breached"
            ),
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// A built-in action that collects every context it receives, for
/// programmatic inspection after a run.
#[derive(Debug, Clone, Default)]
pub struct CollectAction {
    collected: Arc<Mutex<Vec<ActionContext>>>,
}

impl CollectAction {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the contexts collected so far.
    pub fn collected(&self) -> Vec<ActionContext> {
        self.lock().clone()
    }

    // A panicked holder must not wedge later dispatches; the stored
    // contexts stay valid, so poisoning is recoverable.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ActionContext>> {
        self.collected
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Action for CollectAction {
    fn call(&self, cx: &ActionContext) -> Result<()> {
        self.lock().push(cx.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "collect"
    }
}
