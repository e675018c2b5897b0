//! Glide configuration file handling
//!
//! `glide.toml` describes a simulated host loop:
//!
//! ```toml
//! [scheduler]
//! default_threshold = 0.005
//!
//! [simulation]
//! step = 0.1
//! tick_budget = 1000
//!
//! [[lerp]]
//! name = "fade"
//! from = 0.0
//! to = 1.0
//! duration = 0.5
//! owner = "dialog"
//!
//! [[release]]
//! owner = "dialog"
//! at_tick = 3
//! ```

use anyhow::{Context, Result};
use glide_animation::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE: &str = "glide.toml";

/// Whole simulation description
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GlideConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub lerp: Vec<LerpEntry>,
    /// Owners invalidated part way through the run
    #[serde(default)]
    pub release: Vec<OwnerRelease>,
}

/// Host loop settings
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Fixed frame delta in seconds
    #[serde(default = "default_step")]
    pub step: f64,
    /// Stop after this many ticks even if tasks are still live
    #[serde(default = "default_tick_budget")]
    pub tick_budget: u32,
}

fn default_step() -> f64 {
    1.0 / 60.0
}

fn default_tick_budget() -> u32 {
    10_000
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            step: default_step(),
            tick_budget: default_tick_budget(),
        }
    }
}

/// One interpolation to run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LerpEntry {
    pub name: String,
    pub from: f64,
    pub to: f64,
    pub duration: f64,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub max_ticks: Option<u32>,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OwnerRelease {
    pub owner: String,
    pub at_tick: u32,
}

impl GlideConfig {
    /// Load from a file, or from `glide.toml` inside a directory
    pub fn load(path: &Path) -> Result<Self> {
        let config_path = if path.is_dir() {
            path.join(CONFIG_FILE)
        } else {
            path.to_path_buf()
        };

        if !config_path.exists() {
            anyhow::bail!("No config found at {}", config_path.display());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        Self::parse(&content).with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: GlideConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.scheduler.validate()?;

        if !self.simulation.step.is_finite() || self.simulation.step < 0.0 {
            anyhow::bail!("simulation.step must be a non-negative number of seconds");
        }

        for entry in &self.lerp {
            if !entry.duration.is_finite() || entry.duration <= 0.0 {
                anyhow::bail!(
                    "lerp '{}' has invalid duration {}",
                    entry.name,
                    entry.duration
                );
            }
        }

        for release in &self.release {
            if release.at_tick == 0 {
                anyhow::bail!(
                    "release of owner '{}' must happen at tick 1 or later",
                    release.owner
                );
            }
            if !self
                .lerp
                .iter()
                .any(|e| e.owner.as_deref() == Some(release.owner.as_str()))
            {
                anyhow::bail!("release names unknown owner '{}'", release.owner);
            }
        }

        Ok(())
    }

    /// Starter config written by `glide init`
    pub fn sample() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            simulation: SimulationConfig {
                step: 0.1,
                tick_budget: 1_000,
            },
            lerp: vec![
                LerpEntry {
                    name: "fade".to_string(),
                    from: 0.0,
                    to: 1.0,
                    duration: 0.5,
                    threshold: None,
                    max_ticks: None,
                    owner: Some("dialog".to_string()),
                },
                LerpEntry {
                    name: "scroll".to_string(),
                    from: 240.0,
                    to: 0.0,
                    duration: 1.0,
                    threshold: Some(0.5),
                    max_ticks: Some(120),
                    owner: None,
                },
            ],
            release: vec![OwnerRelease {
                owner: "dialog".to_string(),
                at_tick: 3,
            }],
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
