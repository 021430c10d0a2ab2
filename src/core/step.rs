//! Validation step specifications.
//!
//! A [`ValidationStep`] is the immutable description of one validation rule:
//! which kind of rule it is, which columns it targets, its typed parameters,
//! whether it is active, and any per-step severity threshold overrides. Steps
//! are constructed once when the plan is built and consumed read-only by the
//! run orchestrator.

use crate::core::severity::SeverityPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind tag of a validation step.
///
/// Built-in kinds map to the evaluators shipped in
/// [`crate::evaluators`]; `Custom` is the extensibility seam for
/// caller-registered evaluators. The orchestrator dispatches through the
/// evaluator registry keyed by this tag and never inspects the kind itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// The target column exists in the table schema.
    ColExists,
    /// Column values satisfy a scalar comparison.
    ColValsCompare,
    /// Column values fall between two bounds (inclusive).
    ColValsBetween,
    /// Column values match a regular expression.
    ColValsRegex,
    /// Column values are members of an allowed set.
    ColValsInSet,
    /// Column values are non-null.
    ColValsNotNull,
    /// Rows are distinct over the target columns (or the whole row).
    RowsDistinct,
    /// A caller-registered step kind.
    Custom(String),
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::ColExists => write!(f, "col_exists"),
            StepKind::ColValsCompare => write!(f, "col_vals_compare"),
            StepKind::ColValsBetween => write!(f, "col_vals_between"),
            StepKind::ColValsRegex => write!(f, "col_vals_regex"),
            StepKind::ColValsInSet => write!(f, "col_vals_in_set"),
            StepKind::ColValsNotNull => write!(f, "col_vals_not_null"),
            StepKind::RowsDistinct => write!(f, "rows_distinct"),
            StepKind::Custom(tag) => write!(f, "{tag}"),
        }
    }
}

/// The column target of a validation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnTarget {
    /// A table-level step with no column target.
    None,
    /// A single column.
    Column(String),
    /// Multiple columns.
    Columns(Vec<String>),
}

impl ColumnTarget {
    /// Returns the target columns as a slice.
    pub fn columns(&self) -> &[String] {
        match self {
            ColumnTarget::None => &[],
            ColumnTarget::Column(column) => std::slice::from_ref(column),
            ColumnTarget::Columns(columns) => columns,
        }
    }

    /// Returns the single target column, if there is exactly one.
    pub fn single(&self) -> Option<&str> {
        match self {
            ColumnTarget::Column(column) => Some(column),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnTarget::None => write!(f, "-"),
            ColumnTarget::Column(column) => write!(f, "{column}"),
            ColumnTarget::Columns(columns) => write!(f, "{}", columns.join(", ")),
        }
    }
}

/// Scalar comparison operators for `col_vals_compare` steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    /// Values must be greater than the reference value.
    Gt,
    /// Values must be greater than or equal to the reference value.
    Ge,
    /// Values must be less than the reference value.
    Lt,
    /// Values must be less than or equal to the reference value.
    Le,
    /// Values must equal the reference value.
    Eq,
    /// Values must not equal the reference value.
    Ne,
}

impl CompareOp {
    /// Returns the SQL operator text.
    pub fn sql(&self) -> &'static str {
        match self {
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql())
    }
}

/// A member of the allowed set for `col_vals_in_set` steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SetValue {
    /// A string member.
    Text(String),
    /// A numeric member.
    Number(f64),
}

impl From<&str> for SetValue {
    fn from(value: &str) -> Self {
        SetValue::Text(value.to_string())
    }
}

impl From<String> for SetValue {
    fn from(value: String) -> Self {
        SetValue::Text(value)
    }
}

impl From<f64> for SetValue {
    fn from(value: f64) -> Self {
        SetValue::Number(value)
    }
}

impl From<i64> for SetValue {
    fn from(value: i64) -> Self {
        SetValue::Number(value as f64)
    }
}

/// Typed, rule-specific parameters of a validation step.
///
/// Parameters are resolved eagerly when the plan is built; there is no
/// deferred expression evaluation at run time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepParams {
    /// The step takes no parameters.
    None,
    /// A scalar comparison against a reference value.
    Compare {
        /// The comparison operator.
        op: CompareOp,
        /// The reference value.
        value: f64,
    },
    /// An inclusive range check.
    Between {
        /// The lower bound.
        lower: f64,
        /// The upper bound.
        upper: f64,
    },
    /// A regular expression values must match.
    Pattern {
        /// The regex pattern, validated at plan-build time.
        pattern: String,
    },
    /// The set of allowed values.
    InSet {
        /// The allowed members.
        values: Vec<SetValue>,
    },
}

/// An immutable description of one validation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationStep {
    /// 1-based position in the plan's step sequence. Assigned when the plan
    /// is built; stable identity for logging and reporting.
    index: usize,
    kind: StepKind,
    target: ColumnTarget,
    params: StepParams,
    active: bool,
    threshold_overrides: Option<SeverityPolicy>,
    label: Option<String>,
}

impl ValidationStep {
    /// Creates a new step with index 0; the plan builder assigns the final
    /// 1-based index at build time.
    pub fn new(kind: StepKind, target: ColumnTarget, params: StepParams) -> Self {
        Self {
            index: 0,
            kind,
            target,
            params,
            active: true,
            threshold_overrides: None,
            label: None,
        }
    }

    /// Sets whether the step is active. Inactive steps are skipped entirely:
    /// not evaluated, not tallied, not reported.
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Sets per-step severity threshold overrides.
    pub fn with_threshold_overrides(mut self, overrides: SeverityPolicy) -> Self {
        self.threshold_overrides = Some(overrides);
        self
    }

    /// Sets a human-readable label for reporting.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub(crate) fn assign_index(&mut self, index: usize) {
        self.index = index;
    }

    pub(crate) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = Some(label);
    }

    pub(crate) fn set_threshold_overrides(&mut self, overrides: SeverityPolicy) {
        self.threshold_overrides = Some(overrides);
    }

    /// Returns the 1-based step index.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the step kind tag.
    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    /// Returns the column target.
    pub fn target(&self) -> &ColumnTarget {
        &self.target
    }

    /// Returns the rule-specific parameters.
    pub fn params(&self) -> &StepParams {
        &self.params
    }

    /// Returns whether the step is active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the per-step threshold overrides, if any.
    pub fn threshold_overrides(&self) -> Option<&SeverityPolicy> {
        self.threshold_overrides.as_ref()
    }

    /// Returns the step label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}
