//! Core types of the frame-guard validation engine.
//!
//! The engine is assembled from small pieces, leaves first:
//!
//! - **[`ValidationStep`]**: the immutable specification of one rule
//! - **[`Tally`]**: pass/fail/NA counts for one executed step
//! - **[`Severity`] / [`SeverityPolicy`]**: the warn < stop < notify
//!   threshold configuration and [`classify`]
//! - **[`Action`] / [`ActionSet`]**: side-effecting callables fired for the
//!   single highest breached level
//! - **[`ValidationPlan`]**: the run orchestrator producing a [`RunResult`]
//!
//! ```text
//! ValidationPlan::run
//!     └── per active step, in index order:
//!         StepEvaluator ── RawResult ──▶ Tally ──▶ classify ──▶ dispatch
//!                                                                  │
//!         RunResult ◀── StepOutcome ◀──────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use frame_guard::core::{ActionSet, CollectAction, Severity, SeverityPolicy, ValidationPlan};
//! use frame_guard::sources::TableHandle;
//! use std::sync::Arc;
//!
//! # async fn example(table: TableHandle) -> frame_guard::error::Result<()> {
//! let stop_log = CollectAction::new();
//! let plan = ValidationPlan::builder("orders")
//!     .col_vals_gt("amount", 0.0)
//!     .col_vals_not_null("order_id")
//!     .thresholds(SeverityPolicy::new().warn_fraction(0.1).stop_fraction(0.25))
//!     .actions(ActionSet::new().on_stop(Arc::new(stop_log.clone())))
//!     .build()?;
//!
//! let result = plan.run(&table).await;
//! if result.any_breached(Severity::Stop) {
//!     for cx in stop_log.collected() {
//!         eprintln!("step {} breached stop", cx.step_index);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod action;
mod outcome;
mod plan;
mod severity;
pub(crate) mod step;
pub(crate) mod tally;

pub use action::{Action, ActionContext, ActionFailure, ActionSet, CollectAction, LogAction};
pub use outcome::{RunResult, StepOutcome};
pub use plan::{ValidationPlan, ValidationPlanBuilder};
pub use severity::{classify, Classification, Severity, SeverityPolicy, ThresholdSpec};
pub use step::{
    ColumnTarget, CompareOp, SetValue, StepKind, StepParams, ValidationStep,
};
pub use tally::{NaPolicy, RawResult, RowCounts, RowStatus, Tally};
