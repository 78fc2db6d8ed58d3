//! Observability seams injected into the gateway.

use crate::operation::Operation;
use crate::transport::{HttpMethod, Timings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

/// Structured description of a call whose checks failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub url: String,
    pub status: u16,
    pub error_code: u32,
    pub method: String,
    pub response_body: String,
    #[serde(flatten)]
    pub tags: BTreeMap<String, String>,
}

impl ErrorRecord {
    /// Value of the `name` tag, if any.
    pub fn name(&self) -> Option<&str> {
        self.tags.get("name").map(String::as_str)
    }
}

/// Receives a record each time a call fails its checks.
pub trait ErrorSink: Send + Sync {
    fn record_failure(&self, record: &ErrorRecord);
}

/// Logs each failure and counts it.
///
/// Also increments the `errors` counter of the `metrics` facade so an
/// installed recorder can export it.
#[derive(Debug, Default)]
pub struct CountingErrorSink {
    count: AtomicU64,
}

impl CountingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

impl ErrorSink for CountingErrorSink {
    fn record_failure(&self, record: &ErrorRecord) {
        let payload = serde_json::to_string(record).unwrap_or_else(|_| format!("{:?}", record));
        error!(name = record.name().unwrap_or(""), "API Error detected: {}", payload);

        self.count.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(
            "errors",
            "name" => record.name().unwrap_or("").to_string(),
            "method" => record.method.clone(),
            "status" => record.status.to_string()
        )
        .increment(1);
    }
}

/// One request as seen by the metrics pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSample {
    pub operation: Operation,
    pub method: HttpMethod,
    pub status: u16,
    pub timings: Timings,
    pub failed: bool,
    pub checks_passed: usize,
    pub checks_total: usize,
}

/// Receives timing and check outcomes for every call.
pub trait RequestObserver: Send + Sync {
    /// Called once per HTTP request.
    fn observe_request(&self, sample: &RequestSample);

    /// Called for checks evaluated outside a request.
    fn observe_checks(&self, operation: Operation, passed: usize, total: usize);
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RequestObserver for NoopObserver {
    fn observe_request(&self, _sample: &RequestSample) {}

    fn observe_checks(&self, _operation: Operation, _passed: usize, _total: usize) {}
}
