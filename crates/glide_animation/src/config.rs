//! Scheduler configuration
//!
//! Defaults applied to tasks that don't set their own threshold or tick
//! limit. Usually embedded as a `[scheduler]` table in a host config file:
//!
//! ```toml
//! [scheduler]
//! default_threshold = 0.005
//! max_ticks = 600
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};

/// Completion threshold used when a task doesn't specify one
pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 0.005;

/// Defaults shared by every task started on a scheduler
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Threshold for tasks started without an explicit one (0 = exact mode)
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,

    /// Safety valve: cancel a task after this many updates.
    /// `None` lets a non-converging task run until cancelled.
    #[serde(default)]
    pub max_ticks: Option<u32>,
}

fn default_threshold() -> f64 {
    DEFAULT_COMPLETION_THRESHOLD
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_threshold: DEFAULT_COMPLETION_THRESHOLD,
            max_ticks: None,
        }
    }
}

impl SchedulerConfig {
    /// Exact-match termination for every task without its own threshold
    pub fn exact() -> Self {
        Self {
            default_threshold: 0.0,
            ..Self::default()
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: u32) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    /// Parse a standalone config document and validate it
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: SchedulerConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.default_threshold)
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold.is_nan() || threshold < 0.0 {
        return Err(SchedulerError::InvalidThreshold(threshold));
    }
    Ok(())
}

pub(crate) fn validate_duration(duration: f64) -> Result<()> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(SchedulerError::InvalidDuration(duration));
    }
    Ok(())
}
