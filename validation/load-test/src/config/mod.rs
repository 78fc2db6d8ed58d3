//! Configuration: environments, scenarios and thresholds.

pub mod duration;
pub mod env;
pub mod scenario;
pub mod thresholds;

pub use duration::{format_duration, parse_duration};
pub use env::{resolve_environment, EnvironmentConfig, EnvironmentName};
pub use scenario::{target_vus_at, Executor, Scenario, ScenarioCatalog, Stage, DEFAULT_SCENARIO};
pub use thresholds::{build_thresholds, MetricName, Rule, Threshold, ThresholdBounds, ThresholdKey, ThresholdSet};
