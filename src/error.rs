//! Error types for planning runs.

use thiserror::Error;

/// Errors that end a planning run.
///
/// Running out of the time budget is not an error: the search is an anytime
/// algorithm and returns the best plan found so far.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Malformed or empty input, or an invalid configuration constant.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No assignment satisfies the hard constraints.
    #[error("Infeasible: {0}")]
    Infeasible(String),

    /// Configuration file could not be parsed.
    #[error("TOML parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// Reading the question or writing the answer failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The question or answer is not valid JSON for the expected shape.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for planning operations.
pub type Result<T> = std::result::Result<T, PlanError>;
