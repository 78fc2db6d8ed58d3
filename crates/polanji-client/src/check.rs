//! Named boolean assertions evaluated against a response.

use crate::transport::HttpResponse;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type Predicate = Arc<dyn Fn(&HttpResponse) -> bool + Send + Sync>;

/// An ordered set of named predicates defining "success" for one call.
#[derive(Clone, Default)]
pub struct Checks {
    entries: Vec<(String, Predicate)>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arbitrary predicate.
    pub fn custom<F>(mut self, description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&HttpResponse) -> bool + Send + Sync + 'static,
    {
        self.entries.push((description.into(), Arc::new(predicate)));
        self
    }

    /// Passes when the status matches exactly.
    pub fn status(self, description: impl Into<String>, expected: u16) -> Self {
        self.custom(description, move |r| r.status == expected)
    }

    /// Passes when the JSON path resolves to a present, truthy value.
    pub fn json_field_present(self, description: impl Into<String>, path: &'static str) -> Self {
        self.custom(description, move |r| r.json_path(path).is_some_and(|v| is_truthy(&v)))
    }

    /// Passes when the JSON path equals the given string literal.
    pub fn json_field_eq(
        self,
        description: impl Into<String>,
        path: &'static str,
        expected: &'static str,
    ) -> Self {
        self.custom(description, move |r| {
            r.json_path(path).is_some_and(|v| v.as_str() == Some(expected))
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evaluate every predicate. No short circuit.
    pub fn evaluate(&self, response: &HttpResponse) -> CheckReport {
        let mut report = CheckReport::default();
        for (description, predicate) in &self.entries {
            if predicate(response) {
                report.passed.push(description.clone());
            } else {
                report.failed.push(description.clone());
            }
        }
        report
    }
}

impl fmt::Debug for Checks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(name, _)| name))
            .finish()
    }
}

/// Which checks passed and which failed for one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub passed: Vec<String>,
    pub failed: Vec<String>,
}

impl CheckReport {
    pub fn all_passed(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.passed.len() + self.failed.len()
    }
}

// null, false, 0 and "" count as absent
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
