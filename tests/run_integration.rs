//! End-to-end tests for validation runs: severity resolution, action
//! dispatch, failure isolation, and result-set shape.

use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use frame_guard::core::{
    ActionContext, ActionSet, CollectAction, Severity, SeverityPolicy, ValidationPlan,
};
use frame_guard::error::{GuardError, Result};
use frame_guard::sources::TableHandle;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

/// A table with 13 rows in column `d`, of which 8 are at or below 100.0.
async fn thirteen_row_table() -> TableHandle {
    let schema = Arc::new(Schema::new(vec![Field::new("d", DataType::Float64, true)]));
    let values = vec![
        150.0, 101.0, 220.0, 300.0, 180.0, // 5 rows pass `d > 100`
        100.0, 99.0, 50.0, 3.0, 0.0, 42.0, 7.0, 88.0, // 8 rows fail
    ];
    let batch = RecordBatch::try_new(schema, vec![Arc::new(Float64Array::from(values))])
        .expect("batch is valid");
    TableHandle::from_batch("data", batch).await.unwrap()
}

struct Collectors {
    warn: CollectAction,
    stop: CollectAction,
    notify: CollectAction,
}

impl Collectors {
    fn new() -> Self {
        Self {
            warn: CollectAction::new(),
            stop: CollectAction::new(),
            notify: CollectAction::new(),
        }
    }

    fn action_set(&self) -> ActionSet {
        ActionSet::new()
            .on_warn(Arc::new(self.warn.clone()))
            .on_stop(Arc::new(self.stop.clone()))
            .on_notify(Arc::new(self.notify.clone()))
    }
}

#[tokio::test]
async fn test_highest_breached_level_suppresses_lower_actions() {
    // 8 of 13 rows fail `d > 100`: f_failed ~ 0.615 breaches both warn (0.1)
    // and stop (0.25); only the stop actions may fire.
    let table = thirteen_row_table().await;
    let collectors = Collectors::new();

    let plan = ValidationPlan::builder("scenario_a")
        .col_vals_gt("d", 100.0)
        .thresholds(SeverityPolicy::new().warn_fraction(0.1).stop_fraction(0.25))
        .actions(collectors.action_set())
        .build()
        .unwrap();

    let result = plan.run(&table).await;
    let outcome = result.outcome(1).unwrap();

    let counts = outcome.tally.counts().unwrap();
    assert_eq!(counts.n, 13);
    assert_eq!(counts.n_fail, 8);
    assert!((counts.f_failed() - 8.0 / 13.0).abs() < 1e-9);

    assert_eq!(outcome.breached, vec![Severity::Warn, Severity::Stop]);
    assert_eq!(outcome.highest, Some(Severity::Stop));

    assert!(collectors.warn.collected().is_empty());
    assert!(collectors.notify.collected().is_empty());
    let fired = collectors.stop.collected();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].step_index, 1);
    assert_eq!(fired[0].n_fail, Some(8));
    assert!(!fired[0].fallback);
}

#[tokio::test]
async fn test_missing_column_falls_back_to_most_severe_configured() {
    let table = thirteen_row_table().await;
    let collectors = Collectors::new();

    let plan = ValidationPlan::builder("scenario_b")
        .col_vals_gt("z", 100.0)
        .thresholds(SeverityPolicy::new().warn_fraction(0.1).stop_fraction(0.25))
        .actions(collectors.action_set())
        .build()
        .unwrap();

    let result = plan.run(&table).await;
    let outcome = result.outcome(1).unwrap();

    assert!(outcome.evaluation_failed);
    assert!(outcome.tally.counts().is_none());
    assert!(outcome.breached.is_empty());
    assert_eq!(outcome.highest, Some(Severity::Stop));

    let fired = collectors.stop.collected();
    assert_eq!(fired.len(), 1);
    assert!(fired[0].fallback);
    assert_eq!(fired[0].n, None);
    assert!(collectors.warn.collected().is_empty());
}

#[tokio::test]
async fn test_no_thresholds_means_no_actions_but_full_tallies() {
    let table = thirteen_row_table().await;
    let collectors = Collectors::new();

    let plan = ValidationPlan::builder("scenario_c")
        .col_vals_gt("d", 100.0)
        .actions(collectors.action_set())
        .build()
        .unwrap();

    let result = plan.run(&table).await;
    let outcome = result.outcome(1).unwrap();

    assert!(outcome.breached.is_empty());
    assert_eq!(outcome.highest, None);
    assert_eq!(outcome.tally.counts().unwrap().n_fail, 8);
    assert!(collectors.warn.collected().is_empty());
    assert!(collectors.stop.collected().is_empty());
    assert!(collectors.notify.collected().is_empty());
    // The run is a pass: tallied, but nothing armed, nothing breached.
    assert!(result.is_pass());
}

#[tokio::test]
async fn test_inactive_step_produces_no_outcome() {
    let table = thirteen_row_table().await;

    let plan = ValidationPlan::builder("scenario_d")
        .col_exists("d")
        .col_vals_gt("d", 100.0)
        .inactive()
        .col_vals_not_null("d")
        .build()
        .unwrap();

    let result = plan.run(&table).await;
    assert_eq!(result.outcomes.len(), 2);
    assert_eq!(result.outcomes[0].step_index, 1);
    assert_eq!(result.outcomes[1].step_index, 3);
    assert!(result.outcome(2).is_none());
}

#[tokio::test]
async fn test_broken_step_does_not_abort_the_run() {
    let table = thirteen_row_table().await;

    let plan = ValidationPlan::builder("isolation")
        .col_exists("d")
        .col_vals_gt("missing_col", 0.0)
        .col_vals_not_null("d")
        .thresholds(SeverityPolicy::new().warn_fraction(0.1))
        .build()
        .unwrap();

    let result = plan.run(&table).await;
    assert_eq!(result.outcomes.len(), 3);
    let broken = result.outcome(2).unwrap();
    assert!(broken.evaluation_failed);
    // Steps after the broken one still ran and tallied.
    let last = result.outcome(3).unwrap();
    assert!(!last.evaluation_failed);
    assert_eq!(last.tally.counts().unwrap().n, 13);
    assert!(result.any_evaluation_failed());
}

#[tokio::test]
async fn test_rerun_is_deterministic() {
    let table = thirteen_row_table().await;
    let plan = ValidationPlan::builder("idempotence")
        .col_vals_gt("d", 100.0)
        .col_vals_between("d", 0.0, 300.0)
        .rows_distinct()
        .thresholds(SeverityPolicy::new().warn_fraction(0.1).stop_fraction(0.25))
        .build()
        .unwrap();

    let first = plan.run(&table).await;
    let second = plan.run(&table).await;
    assert_eq!(first.outcomes, second.outcomes);
}

#[tokio::test]
async fn test_per_step_threshold_overrides() {
    let table = thirteen_row_table().await;
    let collectors = Collectors::new();

    // Plan-wide stop at 0.25 would breach; the override raises the bar for
    // this step so only warn breaches.
    let plan = ValidationPlan::builder("overrides")
        .col_vals_gt("d", 100.0)
        .step_thresholds(SeverityPolicy::new().warn_fraction(0.1).stop_fraction(0.9))
        .thresholds(SeverityPolicy::new().warn_fraction(0.1).stop_fraction(0.25))
        .actions(collectors.action_set())
        .build()
        .unwrap();

    let result = plan.run(&table).await;
    let outcome = result.outcome(1).unwrap();
    assert_eq!(outcome.breached, vec![Severity::Warn]);
    assert_eq!(outcome.highest, Some(Severity::Warn));
    assert_eq!(collectors.warn.collected().len(), 1);
    assert!(collectors.stop.collected().is_empty());
}

#[tokio::test]
async fn test_count_thresholds() {
    let table = thirteen_row_table().await;
    let plan = ValidationPlan::builder("counts")
        .col_vals_gt("d", 100.0)
        .thresholds(SeverityPolicy::new().warn_count(5).notify_count(9))
        .build()
        .unwrap();

    let result = plan.run(&table).await;
    let outcome = result.outcome(1).unwrap();
    // 8 failing rows: warn at 5 breaches, notify at 9 does not.
    assert_eq!(outcome.breached, vec![Severity::Warn]);
    assert_eq!(outcome.highest, Some(Severity::Warn));
}

/// An action appending one line per breach to a log file.
#[derive(Debug)]
struct FileAppendAction {
    path: PathBuf,
}

impl frame_guard::core::Action for FileAppendAction {
    fn call(&self, cx: &ActionContext) -> Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| GuardError::Action {
                action: "file_append".into(),
                message: e.to_string(),
            })?;
        writeln!(file, "step {} breached {}", cx.step_index, cx.level).map_err(|e| {
            GuardError::Action {
                action: "file_append".into(),
                message: e.to_string(),
            }
        })?;
        Ok(())
    }

    fn name(&self) -> &str {
        "file_append"
    }
}

#[tokio::test]
async fn test_action_io_failure_is_recorded_not_propagated() {
    let table = thirteen_row_table().await;
    let dir = tempfile::tempdir().unwrap();

    let good_path = dir.path().join("breaches.log");
    let broken_path = dir.path().join("no_such_dir").join("breaches.log");

    let plan = ValidationPlan::builder("action_failure")
        .col_vals_gt("d", 100.0)
        .thresholds(SeverityPolicy::new().stop_fraction(0.25))
        .actions(
            ActionSet::new()
                .on_stop(Arc::new(FileAppendAction { path: broken_path }))
                .on_stop(Arc::new(FileAppendAction {
                    path: good_path.clone(),
                })),
        )
        .build()
        .unwrap();

    let result = plan.run(&table).await;
    let outcome = result.outcome(1).unwrap();
    assert_eq!(outcome.action_failures.len(), 1);
    assert_eq!(outcome.action_failures[0].action, "file_append");

    // The action after the broken one still appended.
    let contents = std::fs::read_to_string(&good_path).unwrap();
    assert_eq!(contents, "step 1 breached stop\n");
}

#[tokio::test]
async fn test_run_result_serializes_to_json() {
    let table = thirteen_row_table().await;
    let plan = ValidationPlan::builder("serialization")
        .col_vals_gt("d", 100.0)
        .thresholds(SeverityPolicy::new().warn_fraction(0.1))
        .build()
        .unwrap();

    let result = plan.run(&table).await;
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["plan_name"], "serialization");
    assert_eq!(json["outcomes"][0]["tally"]["n_fail"], 8);
    assert_eq!(json["outcomes"][0]["highest"], "warn");
}

#[tokio::test]
async fn test_multi_step_plan_over_mixed_columns() {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, true),
        Field::new("amount", DataType::Float64, true),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![
                Some(1),
                Some(2),
                Some(2),
                None,
                Some(4),
            ])),
            Arc::new(Float64Array::from(vec![
                Some(10.0),
                Some(-5.0),
                Some(3.0),
                Some(8.0),
                None,
            ])),
        ],
    )
    .unwrap();
    let table = TableHandle::from_batch("payments", batch).await.unwrap();

    let plan = ValidationPlan::builder("payments_quality")
        .col_exists("id")
        .col_vals_not_null("id")
        .step_label("primary key must be populated")
        .col_vals_gt("amount", 0.0)
        .rows_distinct_over(["id"])
        .thresholds(SeverityPolicy::new().warn_fraction(0.1))
        .build()
        .unwrap();

    let result = plan.run(&table).await;
    assert_eq!(result.outcomes.len(), 4);

    // col_exists passes.
    assert!(result.outcome(1).unwrap().is_pass());
    // One null id out of five: not_null counts it as failing.
    let not_null = result.outcome(2).unwrap();
    assert_eq!(not_null.tally.counts().unwrap().n_fail, 1);
    assert_eq!(not_null.label.as_deref(), Some("primary key must be populated"));
    // amount > 0: one negative fails, one null is NA.
    let amounts = result.outcome(3).unwrap().tally.counts().copied().unwrap();
    assert_eq!(amounts.n_fail, 1);
    assert_eq!(amounts.n_na, 1);
    // id = 2 occurs twice.
    let distinct = result.outcome(4).unwrap().tally.counts().copied().unwrap();
    assert_eq!(distinct.n_fail, 2);
}
