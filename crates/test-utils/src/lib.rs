//! Shared test utilities for the course load-test workspace.
//!
//! - [`ScriptedTransport`] answers requests from canned routes and records them
//! - [`RecordingErrorSink`] and [`RecordingObserver`] keep everything the gateway reports
//! - [`fixtures`] builds course API bodies and a full journey script
//!
//! Pull it in as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../../crates/test-utils" }
//! ```

pub mod fixtures;
pub mod recorders;
pub mod transport;

pub use recorders::{RecordingErrorSink, RecordingObserver};
pub use transport::{split_url, ScriptedTransport};

/// Assert two measurements (latencies in ms, rates) agree within `tolerance`.
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(95.03, 95.0, 0.5);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($actual:expr, $expected:expr, $tolerance:expr) => {{
        let (actual, expected, tolerance) = ($actual as f64, $expected as f64, $tolerance as f64);
        assert!(
            (actual - expected).abs() <= tolerance,
            "measurement {} is not within {} of {}",
            actual,
            tolerance,
            expected
        );
    }};
}
