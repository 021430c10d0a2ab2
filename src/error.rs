//! Error types for the frame-guard validation engine.
//!
//! Errors fall into the three kinds the engine distinguishes:
//!
//! - [`GuardError::Configuration`]: a malformed plan or threshold policy,
//!   raised fail-fast when the plan is built, never during a run.
//! - [`GuardError::Evaluation`]: a single step could not be evaluated
//!   (missing column, type mismatch, connector failure). Caught per step by
//!   the orchestrator and recorded on the step's tally.
//! - [`GuardError::Action`]: an action callable failed. Caught per action
//!   and recorded on the step outcome.
//!
//! Nothing from an individual step's evaluation or action dispatch escapes
//! [`ValidationPlan::run`](crate::core::ValidationPlan::run); a run always
//! completes and returns a result.

use thiserror::Error;

/// The error type for all frame-guard operations.
#[derive(Debug, Error)]
pub enum GuardError {
    /// A malformed plan, step specification, or threshold policy.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A validation step could not be evaluated against the bound table.
    #[error("evaluation of step {step_index} failed: {message}")]
    Evaluation {
        /// The 1-based index of the step that failed.
        step_index: usize,
        /// Description of the underlying cause.
        message: String,
    },

    /// An action invoked for a breached severity level failed.
    #[error("action '{action}' failed: {message}")]
    Action {
        /// The name of the failing action.
        action: String,
        /// Description of the failure.
        message: String,
    },

    /// An error from the DataFusion query engine.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// An error from Arrow array handling.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// An I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GuardError {
    /// Creates an evaluation error for the given step.
    pub fn evaluation(step_index: usize, message: impl Into<String>) -> Self {
        Self::Evaluation {
            step_index,
            message: message.into(),
        }
    }

    /// Returns true if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, GuardError::Configuration(_))
    }
}

/// A specialized `Result` type for frame-guard operations.
pub type Result<T> = std::result::Result<T, GuardError>;

/// Extension trait for attaching context to errors.
pub trait ErrorContext<T> {
    /// Wraps the error with a static context message.
    fn context(self, message: &str) -> Result<T>;

    /// Wraps the error with a lazily computed context message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Converts the error into an evaluation failure of the given step, so
    /// the orchestrator records it on the step's tally.
    fn for_step(self, step_index: usize) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn context(self, message: &str) -> Result<T> {
        self.map_err(|e| GuardError::Internal(format!("{message}: {e}")))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let message = f();
            GuardError::Internal(format!("{message}: {e}"))
        })
    }

    fn for_step(self, step_index: usize) -> Result<T> {
        self.map_err(|e| GuardError::Evaluation {
            step_index,
            message: e.to_string(),
        })
    }
}
