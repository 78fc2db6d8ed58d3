//! Error types for load-test configuration and journeys.

use polanji_client::ClientError;
use thiserror::Error;

/// Fatal configuration problems, raised before any journey starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment '{name}'. Available envs are: {available}")]
    UnknownEnvironment { name: String, available: String },

    #[error("Unknown scenario '{name}'. Available scenarios are: {available}")]
    UnknownScenario { name: String, available: String },

    #[error("This test only runs in {allowed} at the moment (selected: {selected})")]
    EnvironmentNotSupported { selected: String, allowed: String },

    #[error("Environment '{0}' has no base URL configured")]
    MissingBaseUrl(String),

    #[error("Invalid duration: '{0}'")]
    InvalidDuration(String),

    #[error("Invalid scenario '{name}': {message}")]
    InvalidScenario { name: String, message: String },

    #[error("Failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse scenario file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Reasons a single journey stops before its terminal verification.
#[derive(Debug, Error)]
pub enum JourneyError {
    #[error("Field '{field}' missing from {operation} response")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },

    #[error("No course to select: recommendation list is empty")]
    NoCourseAvailable,

    #[error(transparent)]
    Client(#[from] ClientError),
}
