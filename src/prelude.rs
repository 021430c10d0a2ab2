//! Prelude for commonly used types and traits in frame-guard.

pub use crate::core::{
    Action, ActionContext, ActionSet, RunResult, Severity, SeverityPolicy, StepOutcome, Tally,
    ValidationPlan,
};
pub use crate::error::{ErrorContext, GuardError, Result};
pub use crate::evaluators::{EvaluatorRegistry, StepEvaluator};
pub use crate::logging::LoggingConfig;
pub use crate::sources::TableHandle;
