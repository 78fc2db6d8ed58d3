//! Threshold evaluation against collected metrics.

use crate::config::ThresholdSet;
use crate::metrics::MetricsCollector;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of one threshold rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOutcome {
    /// Scoped metric, e.g. `checks{name:enrollCourse}`.
    pub key: String,
    /// Rule text, e.g. `rate>=0.95`.
    pub rule: String,
    /// Observed value, `None` when the metric has no data.
    pub value: Option<f64>,
    pub passed: bool,
    pub abort_on_fail: bool,
}

/// Evaluate every threshold. Rules over metrics with no data pass.
pub fn evaluate(thresholds: &ThresholdSet, metrics: &MetricsCollector) -> Vec<ThresholdOutcome> {
    let mut outcomes = Vec::new();
    for (key, rules) in thresholds.iter() {
        for threshold in rules {
            let value = metrics.metric_value(key, &threshold.rule);
            outcomes.push(ThresholdOutcome {
                key: key.to_string(),
                rule: threshold.rule.to_string(),
                value,
                passed: value.map_or(true, |v| threshold.rule.passes(v)),
                abort_on_fail: threshold.abort_on_fail,
            });
        }
    }
    outcomes
}

/// First abort-on-fail threshold that is failing and past its evaluation delay.
pub fn abort_breach(
    thresholds: &ThresholdSet,
    metrics: &MetricsCollector,
    elapsed: Duration,
) -> Option<ThresholdOutcome> {
    thresholds.iter().find_map(|(key, rules)| {
        rules
            .iter()
            .filter(|t| t.abort_on_fail && elapsed >= t.delay_abort_eval)
            .find_map(|t| {
                let value = metrics.metric_value(key, &t.rule)?;
                (!t.rule.passes(value)).then(|| ThresholdOutcome {
                    key: key.to_string(),
                    rule: t.rule.to_string(),
                    value: Some(value),
                    passed: false,
                    abort_on_fail: true,
                })
            })
    })
}
