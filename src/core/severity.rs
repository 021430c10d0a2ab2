//! Severity levels, thresholds, and tally classification.
//!
//! Three escalating severity levels exist: `warn < stop < notify`. Each level
//! is armed independently by an optional [`ThresholdSpec`]; a level with no
//! threshold configured can never trigger. [`classify`] compares a step's
//! tally against the effective policy and resolves the single highest
//! breached level, which is the only level whose actions fire.

use crate::core::tally::{RowCounts, Tally};
use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An escalating severity level.
///
/// The derived ordering ranks `Warn < Stop < Notify`, least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Lowest severity: worth flagging.
    Warn,
    /// The run should be treated as failed.
    Stop,
    /// Highest severity: someone must be told.
    Notify,
}

impl Severity {
    /// All levels in ascending severity order.
    pub const ALL: [Severity; 3] = [Severity::Warn, Severity::Stop, Severity::Notify];
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warn => write!(f, "warn"),
            Severity::Stop => write!(f, "stop"),
            Severity::Notify => write!(f, "notify"),
        }
    }
}

/// A threshold arming one severity level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSpec {
    /// Breached when the failing fraction meets or exceeds this value.
    /// Valid range is `(0, 1]`.
    Fraction(f64),
    /// Breached when the absolute failing-row count meets or exceeds this
    /// value.
    Count(u64),
}

impl ThresholdSpec {
    /// Returns whether the given counts breach this threshold. Comparisons
    /// are inclusive.
    pub fn is_breached(&self, counts: &RowCounts) -> bool {
        match self {
            ThresholdSpec::Fraction(fraction) => counts.f_failed() >= *fraction,
            ThresholdSpec::Count(count) => counts.n_fail >= *count,
        }
    }

    fn validate(&self, level: Severity) -> Result<()> {
        if let ThresholdSpec::Fraction(fraction) = self {
            if !(*fraction > 0.0 && *fraction <= 1.0) {
                return Err(GuardError::Configuration(format!(
                    "{level} threshold fraction must be in (0, 1], got {fraction}"
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ThresholdSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdSpec::Fraction(fraction) => write!(f, "{fraction}"),
            ThresholdSpec::Count(count) => write!(f, "{count} rows"),
        }
    }
}

/// The threshold configuration for the three severity levels.
///
/// Levels are independent and all optional; an empty policy never triggers
/// anything. A plan-wide policy can be overridden per step, field-wise.
///
/// # Examples
///
/// ```rust
/// use frame_guard::core::SeverityPolicy;
///
/// let policy = SeverityPolicy::new()
///     .warn_fraction(0.1)
///     .stop_fraction(0.25)
///     .notify_count(1000);
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityPolicy {
    warn: Option<ThresholdSpec>,
    stop: Option<ThresholdSpec>,
    notify: Option<ThresholdSpec>,
}

impl SeverityPolicy {
    /// Creates an empty policy with no level armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the warn level at a failing fraction.
    pub fn warn_fraction(mut self, fraction: f64) -> Self {
        self.warn = Some(ThresholdSpec::Fraction(fraction));
        self
    }

    /// Arms the warn level at an absolute failing-row count.
    pub fn warn_count(mut self, count: u64) -> Self {
        self.warn = Some(ThresholdSpec::Count(count));
        self
    }

    /// Arms the stop level at a failing fraction.
    pub fn stop_fraction(mut self, fraction: f64) -> Self {
        self.stop = Some(ThresholdSpec::Fraction(fraction));
        self
    }

    /// Arms the stop level at an absolute failing-row count.
    pub fn stop_count(mut self, count: u64) -> Self {
        self.stop = Some(ThresholdSpec::Count(count));
        self
    }

    /// Arms the notify level at a failing fraction.
    pub fn notify_fraction(mut self, fraction: f64) -> Self {
        self.notify = Some(ThresholdSpec::Fraction(fraction));
        self
    }

    /// Arms the notify level at an absolute failing-row count.
    pub fn notify_count(mut self, count: u64) -> Self {
        self.notify = Some(ThresholdSpec::Count(count));
        self
    }

    /// Returns the threshold arming the given level, if any.
    pub fn threshold(&self, level: Severity) -> Option<&ThresholdSpec> {
        match level {
            Severity::Warn => self.warn.as_ref(),
            Severity::Stop => self.stop.as_ref(),
            Severity::Notify => self.notify.as_ref(),
        }
    }

    /// Returns true when no level is armed.
    pub fn is_empty(&self) -> bool {
        self.warn.is_none() && self.stop.is_none() && self.notify.is_none()
    }

    /// Returns the most severe armed level, if any.
    pub fn most_severe_configured(&self) -> Option<Severity> {
        Severity::ALL
            .iter()
            .rev()
            .copied()
            .find(|level| self.threshold(*level).is_some())
    }

    /// Produces the effective policy for a step: each level set in
    /// `overrides` replaces the plan-wide setting for that level.
    pub fn merged_with(&self, overrides: &SeverityPolicy) -> SeverityPolicy {
        SeverityPolicy {
            warn: overrides.warn.or(self.warn),
            stop: overrides.stop.or(self.stop),
            notify: overrides.notify.or(self.notify),
        }
    }

    /// Validates all armed thresholds. Fraction thresholds must lie in
    /// `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        for level in Severity::ALL {
            if let Some(spec) = self.threshold(level) {
                spec.validate(level)?;
            }
        }
        Ok(())
    }
}

/// The result of classifying one tally against a severity policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Armed levels whose threshold was met or exceeded, in ascending
    /// severity order. Empty when the evaluation failed.
    pub breached: Vec<Severity>,
    /// The most severe level whose actions should fire, or `None`.
    pub highest: Option<Severity>,
    /// True when `highest` was forced by an evaluation failure rather than a
    /// threshold breach.
    pub fallback: bool,
}

impl Classification {
    fn none() -> Self {
        Self {
            breached: Vec::new(),
            highest: None,
            fallback: false,
        }
    }
}

/// Classifies a tally against a severity policy.
///
/// For a counted tally, each armed level is breached when its threshold is
/// met or exceeded, and `highest` is the maximum-severity breached level.
/// When the evaluation itself failed there is nothing to compare, so the
/// classification falls back to the most severe armed level: an evaluation
/// failure is never silently swallowed as long as any level is configured.
pub fn classify(tally: &Tally, policy: &SeverityPolicy) -> Classification {
    match tally {
        Tally::EvaluationFailed { .. } => match policy.most_severe_configured() {
            Some(level) => Classification {
                breached: Vec::new(),
                highest: Some(level),
                fallback: true,
            },
            None => Classification::none(),
        },
        Tally::Counted(counts) => {
            let breached: Vec<Severity> = Severity::ALL
                .iter()
                .copied()
                .filter(|level| {
                    policy
                        .threshold(*level)
                        .is_some_and(|spec| spec.is_breached(counts))
                })
                .collect();
            let highest = breached.last().copied();
            Classification {
                breached,
                highest,
                fallback: false,
            }
        }
    }
}
