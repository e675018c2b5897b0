//! Error types for glide_animation

use thiserror::Error;

/// Errors returned when starting interpolation tasks or loading configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    /// Duration was zero, negative, or not finite
    #[error("Invalid duration {0}: must be a finite number of seconds greater than zero")]
    InvalidDuration(f64),

    /// Completion threshold was negative or NaN
    #[error("Invalid completion threshold {0}: must be zero or a positive number")]
    InvalidThreshold(f64),

    /// The scheduler behind a handle has been dropped
    #[error("Scheduler has been dropped")]
    SchedulerDropped,

    /// Configuration could not be parsed
    #[error("Config parsing failed: {0}")]
    Config(String),
}

impl From<toml::de::Error> for SchedulerError {
    fn from(err: toml::de::Error) -> Self {
        SchedulerError::Config(err.to_string())
    }
}

/// Result type for glide_animation operations
pub type Result<T> = std::result::Result<T, SchedulerError>;
