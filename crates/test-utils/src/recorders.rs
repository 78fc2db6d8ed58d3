//! Sinks and observers that keep everything they receive.

use parking_lot::Mutex;
use polanji_client::{ErrorRecord, ErrorSink, Operation, RequestObserver, RequestSample};

/// Error sink capturing every record.
#[derive(Debug, Default)]
pub struct RecordingErrorSink {
    records: Mutex<Vec<ErrorRecord>>,
}

impl RecordingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ErrorRecord> {
        self.records.lock().clone()
    }
}

impl ErrorSink for RecordingErrorSink {
    fn record_failure(&self, record: &ErrorRecord) {
        self.records.lock().push(record.clone());
    }
}

/// Observer capturing request samples and standalone check outcomes.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    samples: Mutex<Vec<RequestSample>>,
    checks: Mutex<Vec<(Operation, usize, usize)>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<RequestSample> {
        self.samples.lock().clone()
    }

    pub fn checks(&self) -> Vec<(Operation, usize, usize)> {
        self.checks.lock().clone()
    }
}

impl RequestObserver for RecordingObserver {
    fn observe_request(&self, sample: &RequestSample) {
        self.samples.lock().push(sample.clone());
    }

    fn observe_checks(&self, operation: Operation, passed: usize, total: usize) {
        self.checks.lock().push((operation, passed, total));
    }
}
