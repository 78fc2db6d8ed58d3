//! The HTTP request gateway: one request, its checks, and failure reporting.

use crate::check::Checks;
use crate::operation::Operation;
use crate::sink::{ErrorRecord, ErrorSink, NoopObserver, RequestObserver, RequestSample};
use crate::transport::{Body, HttpMethod, HttpRequest, HttpResponse, Transport};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A request relative to the gateway's base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Body>,
    pub headers: Vec<(String, String)>,
    pub operation: Operation,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>, operation: Operation) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            operation,
        }
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    pub fn with_headers<I>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        headers
            .into_iter()
            .fold(self, |req, (name, value)| req.with_header(name, value))
    }

    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {}", token))
    }
}

/// Issues requests, evaluates checks, and reports failures.
///
/// Cloning is cheap; every clone shares the same transport and sinks.
#[derive(Clone)]
pub struct Gateway {
    base_url: Arc<str>,
    transport: Arc<dyn Transport>,
    errors: Arc<dyn ErrorSink>,
    observer: Arc<dyn RequestObserver>,
}

impl Gateway {
    pub fn new(
        base_url: impl AsRef<str>,
        transport: Arc<dyn Transport>,
        errors: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            base_url: Arc::from(base_url.as_ref().trim_end_matches('/')),
            transport,
            errors,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Report every request and check outcome to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one request and evaluate `checks` against the response.
    ///
    /// The response is returned whether or not the checks passed; a failed
    /// check set only produces an [`ErrorRecord`] on the error sink.
    #[instrument(skip_all, fields(operation = %request.operation, method = %request.method))]
    pub async fn send(&self, request: ApiRequest, checks: &Checks) -> HttpResponse {
        let http_request = HttpRequest {
            method: request.method,
            url: format!("{}{}", self.base_url, request.path),
            body: request.body,
            headers: request.headers,
            operation: request.operation,
        };

        let response = self.transport.execute(&http_request).await;
        let report = checks.evaluate(&response);
        debug!(
            status = response.status,
            duration_ms = response.timings.duration.as_millis() as u64,
            checks_failed = report.failed.len(),
            "Request completed"
        );

        self.observer.observe_request(&RequestSample {
            operation: http_request.operation,
            method: http_request.method,
            status: response.status,
            timings: response.timings,
            failed: response.is_failed(),
            checks_passed: report.passed.len(),
            checks_total: report.total(),
        });

        if !report.all_passed() {
            self.errors
                .record_failure(&error_record(&response, http_request.operation));
        }

        response
    }

    /// Evaluate checks against a response already in hand.
    ///
    /// Outcomes feed the check metrics only; no error record is emitted.
    pub fn verify(&self, operation: Operation, response: &HttpResponse, checks: &Checks) -> bool {
        let report = checks.evaluate(response);
        self.observer
            .observe_checks(operation, report.passed.len(), report.total());
        if !report.all_passed() {
            debug!(%operation, failed = ?report.failed, "Verification failed");
        }
        report.all_passed()
    }
}

fn error_record(response: &HttpResponse, operation: Operation) -> ErrorRecord {
    ErrorRecord {
        url: response.url.clone(),
        status: response.status,
        error_code: response.error_code,
        method: response.method.to_string(),
        response_body: response.body.clone(),
        tags: BTreeMap::from([("name".to_string(), operation.to_string())]),
    }
}
