//! Per-operation pass/fail rules on aggregated metrics.

use polanji_client::Operation;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Metrics a threshold can be defined on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    HttpReqDuration,
    HttpReqWaiting,
    HttpReqReceiving,
    HttpReqs,
    HttpReqFailed,
    Checks,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::HttpReqDuration => "http_req_duration",
            MetricName::HttpReqWaiting => "http_req_waiting",
            MetricName::HttpReqReceiving => "http_req_receiving",
            MetricName::HttpReqs => "http_reqs",
            MetricName::HttpReqFailed => "http_req_failed",
            MetricName::Checks => "checks",
        }
    }
}

/// A metric scoped to one operation, e.g. `http_req_duration{name:createUser}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ThresholdKey {
    pub metric: MetricName,
    pub operation: Operation,
}

impl fmt::Display for ThresholdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{name:{}}}", self.metric.as_str(), self.operation)
    }
}

/// The comparison applied to an aggregated value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// Percentile of a latency metric must stay under `bound_ms`.
    PercentileBelow { percentile: f64, bound_ms: f64 },
    RateAtMost(f64),
    RateAtLeast(f64),
    CountAtLeast(u64),
}

impl Rule {
    pub fn passes(&self, value: f64) -> bool {
        match *self {
            Rule::PercentileBelow { bound_ms, .. } => value < bound_ms,
            Rule::RateAtMost(bound) => value <= bound,
            Rule::RateAtLeast(bound) => value >= bound,
            Rule::CountAtLeast(bound) => value >= bound as f64,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::PercentileBelow {
                percentile,
                bound_ms,
            } => write!(f, "p({})<{}", percentile, bound_ms),
            Rule::RateAtMost(bound) => write!(f, "rate<={}", bound),
            Rule::RateAtLeast(bound) => write!(f, "rate>={}", bound),
            Rule::CountAtLeast(bound) => write!(f, "count>={}", bound),
        }
    }
}

/// A rule plus its abort policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub rule: Rule,
    /// Stop the whole run as soon as this rule fails.
    pub abort_on_fail: bool,
    /// Do not evaluate for abort until this much of the run has elapsed.
    pub delay_abort_eval: Duration,
}

impl Threshold {
    fn aborting(rule: Rule) -> Self {
        Self {
            rule,
            abort_on_fail: true,
            delay_abort_eval: Duration::from_secs(30),
        }
    }

    fn informational(rule: Rule) -> Self {
        Self {
            rule,
            abort_on_fail: false,
            delay_abort_eval: Duration::ZERO,
        }
    }
}

/// Bounds fed into [`build_thresholds`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdBounds {
    pub response_ms: f64,
    pub waiting_ms: f64,
    pub receiving_ms: f64,
    pub fail_rate: f64,
    pub check_rate: f64,
}

impl Default for ThresholdBounds {
    fn default() -> Self {
        Self {
            response_ms: 3000.0,
            waiting_ms: 2500.0,
            receiving_ms: 1000.0,
            fail_rate: 0.05,
            check_rate: 0.95,
        }
    }
}

/// Thresholds keyed by scoped metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdSet {
    entries: BTreeMap<ThresholdKey, Vec<Threshold>>,
}

impl ThresholdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of both sets. Operation names are unique so keys do not collide.
    pub fn merge(mut self, other: ThresholdSet) -> Self {
        self.entries.extend(other.entries);
        self
    }

    /// Build and merge default thresholds for each operation.
    pub fn for_operations(operations: &[Operation], bounds: &ThresholdBounds) -> Self {
        operations
            .iter()
            .fold(ThresholdSet::new(), |set, op| set.merge(build_thresholds(*op, bounds)))
    }

    /// Override the abort evaluation delay of every aborting threshold.
    pub fn with_abort_delay(mut self, delay: Duration) -> Self {
        for threshold in self.entries.values_mut().flatten() {
            if threshold.abort_on_fail {
                threshold.delay_abort_eval = delay;
            }
        }
        self
    }

    pub fn get(&self, key: &ThresholdKey) -> Option<&[Threshold]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ThresholdKey, &[Threshold])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &ThresholdKey> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Default threshold template scoped to one operation.
///
/// `http_reqs` gets a rule that always passes so the operation shows up in
/// per-operation output even without traffic.
pub fn build_thresholds(operation: Operation, bounds: &ThresholdBounds) -> ThresholdSet {
    let key = |metric| ThresholdKey { metric, operation };
    let p95 = |bound_ms| Rule::PercentileBelow {
        percentile: 95.0,
        bound_ms,
    };

    let entries = BTreeMap::from([
        (
            key(MetricName::HttpReqDuration),
            vec![Threshold::aborting(p95(bounds.response_ms))],
        ),
        (
            key(MetricName::HttpReqWaiting),
            vec![Threshold::aborting(p95(bounds.waiting_ms))],
        ),
        (
            key(MetricName::HttpReqReceiving),
            vec![Threshold::aborting(p95(bounds.receiving_ms))],
        ),
        (
            key(MetricName::HttpReqs),
            vec![Threshold::informational(Rule::CountAtLeast(0))],
        ),
        (
            key(MetricName::HttpReqFailed),
            vec![Threshold::aborting(Rule::RateAtMost(bounds.fail_rate))],
        ),
        (
            key(MetricName::Checks),
            vec![Threshold::aborting(Rule::RateAtLeast(bounds.check_rate))],
        ),
    ]);

    ThresholdSet { entries }
}
