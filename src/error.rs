//! Custom error types for the application.
//!
//! `SenseError` consolidates the failure modes of the collaborator layer:
//! configuration loading and validation, I/O against record sinks, and
//! faults reported by the sample source. The estimation engine itself never
//! fails through this type; fit quality is expressed through per-channel
//! error values and the validity flag on a finished measurement, so a wave
//! that refuses to converge is data, not an `Err`.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, SenseError>;

#[derive(Error, Debug)]
pub enum SenseError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sample source error: {0}")]
    Source(String),

    #[error("Unknown analog input {0}")]
    UnknownInput(usize),

    #[error("Record sink error: {0}")]
    Sink(String),
}
