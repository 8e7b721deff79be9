use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning parameters for episode search and compression.
///
/// Built through [`Config::new`] (or [`Default`]) so that weights and ratios are
/// range-checked once, up front. A value obtained by deserialization should be
/// passed through [`Config::validate`] before use.
///
/// ## Parameters
///
/// - `k`: maximum number of episodes retained per search round
/// - `gap_ratio`: tolerated gap between occurrences, relative to pattern length
/// - `weight_support`: weight of support against proximity in the score
/// - `proximity_balancing`: balance between inside (0) and outside (1) proximity
/// - `time_budget`: wall-clock budget for one compression
/// - `parallel_threshold`: average raw windows per extension above which
///   overlap resolution is fanned out to the worker pool
/// - `workers`: size of that worker pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub k: usize,
    pub gap_ratio: f64,
    pub weight_support: f64,
    pub proximity_balancing: f64,
    pub time_budget: Duration,
    pub parallel_threshold: usize,
    pub workers: usize,
}

impl Config {
    /// Creates a configuration from the four core options, keeping the default
    /// time budget and worker settings.
    pub fn new(
        k: usize,
        gap_ratio: f64,
        weight_support: f64,
        proximity_balancing: f64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            k,
            gap_ratio,
            weight_support,
            proximity_balancing,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks every field against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 {
            return Err(ConfigError::ZeroK);
        }
        if !self.gap_ratio.is_finite() || self.gap_ratio < 0.0 {
            return Err(ConfigError::InvalidGapRatio(self.gap_ratio));
        }
        check_weight("weight_support", self.weight_support)?;
        check_weight("proximity_balancing", self.proximity_balancing)?;
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        Ok(())
    }

    /// Replaces the wall-clock budget.
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    /// Replaces the worker pool size.
    pub fn with_workers(mut self, workers: usize) -> Result<Self, ConfigError> {
        if workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        self.workers = workers;
        Ok(self)
    }

    /// Replaces the fan-out threshold.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

fn check_weight(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::WeightOutOfRange { name, value })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            k: 10,
            gap_ratio: 0.5,
            weight_support: 0.5,
            proximity_balancing: 0.5,
            time_budget: Duration::from_secs(20),
            parallel_threshold: 32,
            workers: 4,
        }
    }
}
