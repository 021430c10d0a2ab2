//! # Frame Guard - Data-Quality Validation for Rust
//!
//! Frame Guard is a declarative data-quality validation engine. You describe
//! a *validation plan* — an ordered list of typed validation steps such as
//! "column exists", "values match a regex", "values greater than X", "rows
//! are distinct" — and run it against a tabular data source. Each step is
//! tallied into pass/fail/NA counts, the failing fraction is compared
//! against configurable warn/stop/notify severity thresholds, and the action
//! list of the single highest breached level fires.
//!
//! Tables are bound through DataFusion, so the same plan runs unchanged
//! against an in-memory Arrow table or any table provider registered in a
//! `SessionContext`.
//!
//! ## Quick Start
//!
//! ```rust
//! use arrow::array::Float64Array;
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use frame_guard::core::{ActionSet, LogAction, Severity, SeverityPolicy, ValidationPlan};
//! use frame_guard::sources::TableHandle;
//! use std::sync::Arc;
//!
//! # async fn example() -> frame_guard::error::Result<()> {
//! // Bind an in-memory table.
//! let schema = Arc::new(Schema::new(vec![Field::new("d", DataType::Float64, true)]));
//! let batch = RecordBatch::try_new(
//!     schema,
//!     vec![Arc::new(Float64Array::from(vec![120.0, 80.0, 95.0, 210.0]))],
//! )?;
//! let table = TableHandle::from_batch("orders", batch).await?;
//!
//! // Describe the plan.
//! let plan = ValidationPlan::builder("order_quality")
//!     .col_exists("d")
//!     .col_vals_gt("d", 100.0)
//!     .thresholds(SeverityPolicy::new().warn_fraction(0.1).stop_fraction(0.25))
//!     .actions(ActionSet::new().on_stop(Arc::new(LogAction)))
//!     .build()?;
//!
//! // Run it. A run always completes; inspect the result.
//! let result = plan.run(&table).await;
//! assert!(result.any_breached(Severity::Stop));
//! for outcome in &result.outcomes {
//!     println!("step {} highest: {:?}", outcome.step_index, outcome.highest);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Concepts
//!
//! - **Step**: one declarative rule, described by [`core::ValidationStep`].
//!   Inactive steps are skipped entirely.
//! - **Tally**: pass/fail/NA row counts for one step
//!   ([`core::Tally`]); each step type declares how undecidable (NA) rows
//!   are treated.
//! - **Severity**: three escalating levels, `warn < stop < notify`, armed
//!   independently by fraction or absolute-count thresholds
//!   ([`core::SeverityPolicy`]), overridable per step.
//! - **Action**: a side-effecting callable fired when its level is the
//!   *highest* breached level of a step — lower breached levels are
//!   suppressed.
//! - **Isolation**: a step whose evaluation errors is recorded as
//!   `evaluation_failed` and falls back to the most severe configured
//!   level's actions; it never aborts the run.
//!
//! ## Architecture
//!
//! - **`core`**: steps, tallies, severity classification, actions, plans
//! - **`evaluators`**: the table-evaluator boundary and built-in step kinds
//! - **`sources`**: table binding over DataFusion
//! - **`security`**: SQL identifier/literal hardening
//! - **`logging`**: tracing subscriber setup helper
//!
//! New step kinds are added by implementing
//! [`evaluators::StepEvaluator`] and registering it; the run orchestrator
//! dispatches through the registry and never inspects step kinds.

pub mod core;
pub mod error;
pub mod evaluators;
pub mod logging;
pub mod prelude;
pub mod security;
pub mod sources;
