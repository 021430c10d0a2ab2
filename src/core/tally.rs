//! Tally computation: reducing raw evaluation results into counts.
//!
//! A step evaluator hands back a [`RawResult`]: either one
//! [`RowStatus`] per table row, or counts it already aggregated (the only
//! option for large remote tables where per-row materialization is
//! infeasible). The tally computer reduces that into [`RowCounts`] under the
//! step type's [`NaPolicy`], and wraps it in a [`Tally`] that also models the
//! "evaluation itself failed" case.

use serde::{Deserialize, Serialize};

/// Per-row classification of a validation predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    /// The row satisfies the predicate.
    Pass,
    /// The row violates the predicate.
    Fail,
    /// The predicate could not be decided for the row (e.g. a null input).
    Na,
}

/// The raw output of a step evaluator, before tallying.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    /// One status per table row, aligned to table row order.
    PerRow(Vec<RowStatus>),
    /// Counts aggregated by the evaluator itself (e.g. via a single SQL
    /// aggregate query). The evaluator is responsible for having applied its
    /// own NA policy when it folded rows into these counts.
    Aggregate(RowCounts),
}

impl RawResult {
    /// Builds a pre-aggregated result from a total and a failing count, with
    /// no NA rows.
    pub fn aggregate(n: u64, n_fail: u64) -> Self {
        debug_assert!(n_fail <= n);
        RawResult::Aggregate(RowCounts {
            n,
            n_pass: n.saturating_sub(n_fail),
            n_fail,
            n_na: 0,
        })
    }
}

/// How a step type treats rows whose predicate is undecidable (NA).
///
/// The policy is part of each step type's contract, declared by its
/// evaluator at registration, not inferred from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NaPolicy {
    /// NA rows are excluded from the passing/failing denominator.
    Exclude,
    /// NA rows count as failures (e.g. a not-null rule).
    Fail,
}

/// Pass/fail/NA row counts for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCounts {
    /// Total rows evaluated.
    pub n: u64,
    /// Rows that satisfied the predicate.
    pub n_pass: u64,
    /// Rows that violated the predicate.
    pub n_fail: u64,
    /// Rows where the predicate was undecidable.
    pub n_na: u64,
}

impl RowCounts {
    /// The failing fraction: `n_fail` over the decidable rows
    /// (`n - n_na`). Exactly `0.0` when the denominator is zero, so an empty
    /// or all-NA result never amplifies into a false positive. Always in
    /// `[0, 1]`.
    pub fn f_failed(&self) -> f64 {
        let denominator = self.n.saturating_sub(self.n_na);
        if denominator == 0 {
            0.0
        } else {
            self.n_fail as f64 / denominator as f64
        }
    }

    /// Checks the counting invariant `n_pass + n_fail + n_na == n`.
    pub fn is_consistent(&self) -> bool {
        self.n_pass + self.n_fail + self.n_na == self.n
    }
}

/// The tallied outcome of evaluating one step.
///
/// Either row counts, or a marker that the evaluation itself failed, in
/// which case all counts are unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Tally {
    /// Evaluation succeeded and produced counts.
    Counted(RowCounts),
    /// Evaluation raised an unrecoverable error; no counts are available.
    EvaluationFailed {
        /// Description of the underlying cause.
        message: String,
    },
}

impl Tally {
    /// Reduces a raw evaluation result into a tally under the given NA
    /// policy.
    ///
    /// Per-row results are counted status by status; under
    /// [`NaPolicy::Fail`] NA rows are folded into the failing count.
    /// Pre-aggregated counts pass through unchanged, since the evaluator
    /// applied its policy when it aggregated.
    pub fn from_raw(raw: RawResult, policy: NaPolicy) -> Self {
        let counts = match raw {
            RawResult::PerRow(statuses) => {
                let mut counts = RowCounts {
                    n: statuses.len() as u64,
                    n_pass: 0,
                    n_fail: 0,
                    n_na: 0,
                };
                for status in statuses {
                    match status {
                        RowStatus::Pass => counts.n_pass += 1,
                        RowStatus::Fail => counts.n_fail += 1,
                        RowStatus::Na => counts.n_na += 1,
                    }
                }
                if policy == NaPolicy::Fail {
                    counts.n_fail += counts.n_na;
                    counts.n_na = 0;
                }
                counts
            }
            RawResult::Aggregate(counts) => counts,
        };
        Tally::Counted(counts)
    }

    /// Builds a tally for a step whose evaluation failed.
    pub fn evaluation_failed(message: impl Into<String>) -> Self {
        Tally::EvaluationFailed {
            message: message.into(),
        }
    }

    /// Returns true when the evaluation itself failed.
    pub fn is_evaluation_failed(&self) -> bool {
        matches!(self, Tally::EvaluationFailed { .. })
    }

    /// Returns the counts, if evaluation succeeded.
    pub fn counts(&self) -> Option<&RowCounts> {
        match self {
            Tally::Counted(counts) => Some(counts),
            Tally::EvaluationFailed { .. } => None,
        }
    }

    /// Returns the failing fraction, if evaluation succeeded.
    pub fn f_failed(&self) -> Option<f64> {
        self.counts().map(RowCounts::f_failed)
    }
}
