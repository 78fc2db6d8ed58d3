//! Metrics collection and statistics.

use crate::config::{MetricName, Rule, ThresholdKey};
use crate::verdict::ThresholdOutcome;
use hdrhistogram::Histogram;
use parking_lot::Mutex;
use polanji_client::{Operation, RequestObserver, RequestSample};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Raw per-operation aggregates.
struct OperationMetrics {
    duration: Histogram<u64>,
    waiting: Histogram<u64>,
    receiving: Histogram<u64>,
    requests: u64,
    failed: u64,
    checks_passed: u64,
    checks_total: u64,
}

impl OperationMetrics {
    fn new() -> Self {
        let histogram = || Histogram::new(3).expect("3 significant figures is a valid precision");
        Self {
            duration: histogram(),
            waiting: histogram(),
            receiving: histogram(),
            requests: 0,
            failed: 0,
            checks_passed: 0,
            checks_total: 0,
        }
    }

    fn histogram(&self, metric: MetricName) -> Option<&Histogram<u64>> {
        match metric {
            MetricName::HttpReqDuration => Some(&self.duration),
            MetricName::HttpReqWaiting => Some(&self.waiting),
            MetricName::HttpReqReceiving => Some(&self.receiving),
            _ => None,
        }
    }

    fn stats(&self, operation: Operation) -> OperationStats {
        OperationStats {
            operation,
            requests: self.requests,
            failed: self.failed,
            fail_rate: ratio(self.failed, self.requests),
            checks_passed: self.checks_passed,
            checks_total: self.checks_total,
            check_rate: ratio(self.checks_passed, self.checks_total),
            duration: LatencyStats::from_histogram(&self.duration),
            waiting: LatencyStats::from_histogram(&self.waiting),
            receiving: LatencyStats::from_histogram(&self.receiving),
        }
    }
}

fn ratio(part: u64, whole: u64) -> Option<f64> {
    (whole > 0).then(|| part as f64 / whole as f64)
}

fn micros(d: Duration) -> u64 {
    d.as_micros().min(u64::MAX as u128) as u64
}

/// How a journey iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// Reached the terminal check; `verified` is its result.
    Completed { verified: bool },
    /// Stopped early on missing data.
    Aborted,
    /// Cut off by the end of the run.
    Interrupted,
}

/// Collects metrics during load test execution. Shared by all VUs.
pub struct MetricsCollector {
    operations: Mutex<BTreeMap<Operation, OperationMetrics>>,
    iterations_completed: AtomicU64,
    iterations_verified: AtomicU64,
    iterations_aborted: AtomicU64,
    iterations_interrupted: AtomicU64,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            operations: Mutex::new(BTreeMap::new()),
            iterations_completed: AtomicU64::new(0),
            iterations_verified: AtomicU64::new(0),
            iterations_aborted: AtomicU64::new(0),
            iterations_interrupted: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_iteration(&self, outcome: IterationOutcome) {
        match outcome {
            IterationOutcome::Completed { verified } => {
                self.iterations_completed.fetch_add(1, Ordering::Relaxed);
                if verified {
                    self.iterations_verified.fetch_add(1, Ordering::Relaxed);
                }
            }
            IterationOutcome::Aborted => {
                self.iterations_aborted.fetch_add(1, Ordering::Relaxed);
            }
            IterationOutcome::Interrupted => {
                self.iterations_interrupted.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn iterations_completed(&self) -> u64 {
        self.iterations_completed.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Aggregated value a threshold rule compares against.
    ///
    /// Returns `None` when the operation has no data for that metric yet.
    pub fn metric_value(&self, key: &ThresholdKey, rule: &Rule) -> Option<f64> {
        let operations = self.operations.lock();
        let m = operations.get(&key.operation);
        match key.metric {
            MetricName::HttpReqs => Some(m.map_or(0, |m| m.requests) as f64),
            MetricName::HttpReqFailed => m.and_then(|m| ratio(m.failed, m.requests)),
            MetricName::Checks => m.and_then(|m| ratio(m.checks_passed, m.checks_total)),
            metric => {
                let histogram = m?.histogram(metric)?;
                if histogram.is_empty() {
                    return None;
                }
                let percentile = match rule {
                    Rule::PercentileBelow { percentile, .. } => *percentile,
                    _ => 95.0,
                };
                Some(histogram.value_at_percentile(percentile) as f64 / 1000.0)
            }
        }
    }

    /// Per-operation statistics in operation order.
    pub fn operation_stats(&self) -> Vec<OperationStats> {
        self.operations
            .lock()
            .iter()
            .map(|(op, m)| m.stats(*op))
            .collect()
    }

    /// Generate final test results.
    pub fn results(&self, run: RunInfo, errors: u64, thresholds: Vec<ThresholdOutcome>) -> TestResults {
        let operations = self.operation_stats();
        let total_requests: u64 = operations.iter().map(|o| o.requests).sum();
        let failed_requests: u64 = operations.iter().map(|o| o.failed).sum();
        let duration_secs = self.elapsed().as_secs_f64();
        let thresholds_passed = thresholds.iter().all(|t| t.passed);

        TestResults {
            timestamp: chrono::Utc::now().to_rfc3339(),
            scenario_name: run.scenario_name,
            environment: run.environment,
            executor: run.executor,
            max_vus: run.max_vus,
            duration_secs,
            iterations_completed: self.iterations_completed.load(Ordering::Relaxed),
            iterations_verified: self.iterations_verified.load(Ordering::Relaxed),
            iterations_aborted: self.iterations_aborted.load(Ordering::Relaxed),
            iterations_interrupted: self.iterations_interrupted.load(Ordering::Relaxed),
            total_requests,
            failed_requests,
            requests_per_second: if duration_secs > 0.0 {
                total_requests as f64 / duration_secs
            } else {
                0.0
            },
            errors,
            operations,
            thresholds,
            thresholds_passed,
            aborted_by: run.aborted_by,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestObserver for MetricsCollector {
    fn observe_request(&self, sample: &RequestSample) {
        let mut operations = self.operations.lock();
        let m = operations
            .entry(sample.operation)
            .or_insert_with(OperationMetrics::new);
        m.requests += 1;
        if sample.failed {
            m.failed += 1;
        }
        m.checks_passed += sample.checks_passed as u64;
        m.checks_total += sample.checks_total as u64;
        m.duration.record(micros(sample.timings.duration)).ok();
        m.waiting.record(micros(sample.timings.waiting)).ok();
        m.receiving.record(micros(sample.timings.receiving)).ok();
    }

    fn observe_checks(&self, operation: Operation, passed: usize, total: usize) {
        let mut operations = self.operations.lock();
        let m = operations.entry(operation).or_insert_with(OperationMetrics::new);
        m.checks_passed += passed as u64;
        m.checks_total += total as u64;
    }
}

/// Latency summary in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl LatencyStats {
    fn from_histogram(h: &Histogram<u64>) -> Self {
        if h.is_empty() {
            return Self::default();
        }
        Self {
            p50: h.value_at_percentile(50.0) as f64 / 1000.0,
            p90: h.value_at_percentile(90.0) as f64 / 1000.0,
            p95: h.value_at_percentile(95.0) as f64 / 1000.0,
            p99: h.value_at_percentile(99.0) as f64 / 1000.0,
            min: h.min() as f64 / 1000.0,
            max: h.max() as f64 / 1000.0,
            avg: h.mean() / 1000.0,
        }
    }
}

/// Statistics for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    pub operation: Operation,
    pub requests: u64,
    pub failed: u64,
    pub fail_rate: Option<f64>,
    pub checks_passed: u64,
    pub checks_total: u64,
    pub check_rate: Option<f64>,
    pub duration: LatencyStats,
    pub waiting: LatencyStats,
    pub receiving: LatencyStats,
}

/// Descriptive facts about a run, supplied by the runner.
#[derive(Debug, Clone, Default)]
pub struct RunInfo {
    pub scenario_name: String,
    pub environment: String,
    pub executor: String,
    pub max_vus: u32,
    pub aborted_by: Option<String>,
}

/// Final test results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResults {
    pub timestamp: String,
    pub scenario_name: String,
    pub environment: String,
    pub executor: String,
    pub max_vus: u32,
    pub duration_secs: f64,

    // Journeys
    pub iterations_completed: u64,
    pub iterations_verified: u64,
    pub iterations_aborted: u64,
    pub iterations_interrupted: u64,

    // Requests
    pub total_requests: u64,
    pub failed_requests: u64,
    pub requests_per_second: f64,
    pub errors: u64,
    pub operations: Vec<OperationStats>,

    // Thresholds
    pub thresholds: Vec<ThresholdOutcome>,
    pub thresholds_passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted_by: Option<String>,
}
