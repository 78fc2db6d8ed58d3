//! Results reporting and formatting.

use crate::metrics::{OperationStats, TestResults};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

/// Formats test results for output.
pub struct ResultsReport;

impl ResultsReport {
    /// Format results as console tables: run summary, per-operation stats, thresholds.
    pub fn format_table(results: &TestResults) -> String {
        let mut summary = Table::new();
        summary
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![format!(
                "Load Test Results: {} ({})",
                results.scenario_name, results.environment
            )]);

        summary.add_row(vec!["Executor:", &format!("{} (max {} VUs)", results.executor, results.max_vus)]);
        summary.add_row(vec!["Duration:", &format!("{:.1}s", results.duration_secs)]);
        summary.add_row(vec![
            "Journeys:",
            &format!(
                "{} completed / {} verified / {} aborted / {} interrupted",
                results.iterations_completed,
                results.iterations_verified,
                results.iterations_aborted,
                results.iterations_interrupted
            ),
        ]);
        summary.add_row(vec!["Total Requests:", &results.total_requests.to_string()]);
        summary.add_row(vec!["Success Rate:", &percent(success_rate(results))]);
        summary.add_row(vec!["Requests/sec:", &format!("{:.1}", results.requests_per_second)]);
        summary.add_row(vec!["API Errors:", &results.errors.to_string()]);
        if let Some(reason) = &results.aborted_by {
            summary.add_row(vec!["Aborted By:", reason]);
        }

        let mut operations = Table::new();
        operations
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                "Operation",
                "Reqs",
                "Failed",
                "Checks",
                "p50 (ms)",
                "p95 (ms)",
                "p99 (ms)",
                "max (ms)",
            ]);
        for op in &results.operations {
            operations.add_row(operation_row(op));
        }

        let mut out = format!("{}\n{}\n", summary, operations);
        if !results.thresholds.is_empty() {
            let mut thresholds = Table::new();
            thresholds
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec!["", "Threshold", "Rule", "Value"]);
            for t in &results.thresholds {
                let (mark, color) = if t.passed { ("✓", Color::Green) } else { ("✗", Color::Red) };
                thresholds.add_row(vec![
                    Cell::new(mark).fg(color),
                    Cell::new(&t.key),
                    Cell::new(&t.rule),
                    Cell::new(t.value.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v))),
                ]);
            }
            out.push_str(&thresholds.to_string());
            out.push('\n');
        }
        out
    }

    /// Format results as JSON.
    pub fn format_json(results: &TestResults) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(results)?)
    }

    /// Format results as CSV, one row per operation.
    pub fn format_csv(results: &TestResults) -> String {
        results
            .operations
            .iter()
            .map(|op| {
                format!(
                    "{},{},{},{},{},{},{:.4},{:.1},{:.1},{:.1},{}",
                    results.timestamp,
                    results.scenario_name,
                    results.environment,
                    op.operation,
                    op.requests,
                    op.failed,
                    op.check_rate.unwrap_or(0.0),
                    op.duration.p50,
                    op.duration.p95,
                    op.duration.p99,
                    results.thresholds_passed
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// CSV header row.
    pub fn csv_header() -> &'static str {
        "timestamp,scenario,environment,operation,requests,failed,check_rate,p50,p95,p99,thresholds_passed"
    }
}

fn success_rate(results: &TestResults) -> Option<f64> {
    (results.total_requests > 0).then(|| {
        (results.total_requests - results.failed_requests) as f64 / results.total_requests as f64
    })
}

fn percent(rate: Option<f64>) -> String {
    rate.map_or_else(|| "-".to_string(), |r| format!("{:.1}%", r * 100.0))
}

fn operation_row(op: &OperationStats) -> Vec<String> {
    vec![
        op.operation.to_string(),
        op.requests.to_string(),
        op.failed.to_string(),
        percent(op.check_rate),
        format!("{:.1}", op.duration.p50),
        format!("{:.1}", op.duration.p95),
        format!("{:.1}", op.duration.p99),
        format!("{:.1}", op.duration.max),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{LatencyStats, TestResults};
    use crate::verdict::ThresholdOutcome;
    use polanji_client::Operation;

    fn results() -> TestResults {
        TestResults {
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            scenario_name: "smoke".to_string(),
            environment: "staging".to_string(),
            executor: "shared-iterations".to_string(),
            max_vus: 1,
            duration_secs: 12.5,
            iterations_completed: 1,
            iterations_verified: 1,
            iterations_aborted: 0,
            iterations_interrupted: 0,
            total_requests: 4,
            failed_requests: 1,
            requests_per_second: 0.32,
            errors: 1,
            operations: vec![OperationStats {
                operation: Operation::EnrollCourse,
                requests: 4,
                failed: 1,
                fail_rate: Some(0.25),
                checks_passed: 3,
                checks_total: 4,
                check_rate: Some(0.75),
                duration: LatencyStats {
                    p50: 120.0,
                    p95: 300.0,
                    p99: 310.0,
                    max: 312.0,
                    ..LatencyStats::default()
                },
                waiting: LatencyStats::default(),
                receiving: LatencyStats::default(),
            }],
            thresholds: vec![ThresholdOutcome {
                key: "checks{name:enrollCourse}".to_string(),
                rule: "rate>=0.95".to_string(),
                value: Some(0.75),
                passed: false,
                abort_on_fail: false,
            }],
            thresholds_passed: false,
            aborted_by: None,
        }
    }

    #[test]
    fn test_table_lists_operations_and_thresholds() {
        let table = ResultsReport::format_table(&results());
        assert!(table.contains("Load Test Results: smoke (staging)"));
        assert!(table.contains("enrollCourse"));
        assert!(table.contains("75.0%"));
        assert!(table.contains("checks{name:enrollCourse}"));
        assert!(table.contains("✗"));
    }

    #[test]
    fn test_csv_row_matches_header() {
        let results = results();
        let header_cols = ResultsReport::csv_header().split(',').count();
        let row = ResultsReport::format_csv(&results);
        assert_eq!(row.split(',').count(), header_cols);
        assert!(row.contains(",enrollCourse,4,1,0.7500,120.0,300.0,310.0,false"));
    }

    #[test]
    fn test_json_is_parseable() {
        let json = ResultsReport::format_json(&results()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["thresholds_passed"], false);
        assert_eq!(value["operations"][0]["operation"], "enrollCourse");
    }
}
