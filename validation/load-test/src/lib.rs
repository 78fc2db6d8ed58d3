//! Load testing framework for the Polanji course-completion journey.
//!
//! This crate provides tools to:
//! - Resolve target environments, load scenarios and per-operation thresholds
//! - Drive the sign-up to course-completion journey with many virtual users
//! - Collect per-operation latency, failure and check metrics
//! - Output results in multiple formats (console, JSON, CSV)

pub mod config;
pub mod error;
pub mod journey;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod verdict;

pub use config::{EnvironmentConfig, EnvironmentName, Scenario, ScenarioCatalog, ThresholdSet};
pub use error::{ConfigError, JourneyError};
pub use journey::{CourseApi, CourseCompletion, JourneyReport, Pacer, Session, TokioPacer};
pub use metrics::{MetricsCollector, TestResults};
pub use report::ResultsReport;
pub use runner::{LoadRunner, RunnerConfig};
