//! Planner configuration.
//!
//! Every numeric constant of the model and the search lives here so that the
//! builder and engine can be exercised against varied instances. Defaults
//! reproduce the reference planning horizon (10:30 → 13:00, deliveries from
//! 11:00, 2-minute safety margin).
//!
//! # Examples
//!
//! ```
//! use u_pdptw::config::{FirstSolution, PlannerConfig};
//!
//! let config = PlannerConfig::from_toml_str(r#"
//!     [model]
//!     speed = 4
//!
//!     [search]
//!     time_limit_ms = 2000
//!     first_solution = "empty"
//! "#).unwrap();
//!
//! assert_eq!(config.model.speed, 4);
//! assert_eq!(config.model.service_minutes, 2);
//! assert_eq!(config.search.first_solution, FirstSolution::Empty);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::ClockEpoch;
use crate::error::Result;

/// Top-level configuration of a planning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Constants of the node/constraint model.
    pub model: ModelConfig,
    /// Search budget and metaheuristic parameters.
    pub search: SearchConfig,
    /// Post-optimization phases.
    pub postprocess: PostprocessConfig,
    /// Clock encoding epoch.
    pub epoch: ClockEpoch,
}

impl PlannerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Sets the whole-run time budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.search.time_limit_ms = limit.as_millis() as u64;
        self
    }

    /// Sets the tail of the budget reserved for polishing.
    pub fn with_polish_window(mut self, window: Duration) -> Self {
        self.postprocess.polish_ms = window.as_millis() as u64;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.search.seed = seed;
        self
    }

    /// Sets the first-solution strategy and disables the portfolio.
    pub fn with_first_solution(mut self, first: FirstSolution) -> Self {
        self.search.first_solution = first;
        self.search.portfolio = false;
        self
    }

    /// Enables or disables carried-time polishing.
    pub fn with_polish(mut self, polish: bool) -> Self {
        self.postprocess.polish = polish;
        self
    }

    /// Enables or disables late-order recovery.
    pub fn with_late_order_recovery(mut self, recover: bool) -> Self {
        self.postprocess.recover_late_orders = recover;
        self
    }
}

/// Constants of the pickup-delivery model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Orders beyond this count are left out of planning.
    pub max_orders: usize,
    /// Distance units travelled per minute.
    pub speed: i64,
    /// Fixed minutes added to every transit for loading or unloading.
    pub service_minutes: i64,
    /// Minute at which the horizon closes.
    pub cutoff_minute: i64,
    /// Safety margin subtracted from the cutoff and from each window end.
    pub margin_minutes: i64,
    /// No delivery may happen before this minute.
    pub earliest_delivery: i64,
    /// Penalty per excluded node; `None` uses the largest pairwise distance.
    pub exclusion_penalty: Option<i64>,
}

impl ModelConfig {
    /// Last minute at which any node may be served.
    pub fn horizon_end(&self) -> i64 {
        self.cutoff_minute - self.margin_minutes
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_orders: 2000,
            speed: 5,
            service_minutes: 2,
            cutoff_minute: 150,
            margin_minutes: 2,
            earliest_delivery: 30,
            exclusion_penalty: None,
        }
    }
}

/// How the search builds its starting plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstSolution {
    /// Every order excluded; local search inserts them.
    Empty,
    /// Greedy cheapest pair insertion on top of the empty plan.
    #[default]
    CheapestInsertion,
}

/// Search budget and guided local search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Wall-clock budget of the whole run, in milliseconds.
    pub time_limit_ms: u64,
    /// Scales the guided penalty weight against the mean arc distance.
    pub penalty_factor: f64,
    /// Penalization rounds without a new best plan before giving up.
    pub stagnation_limit: u32,
    /// Starting plan of a single search.
    pub first_solution: FirstSolution,
    /// Runs both first-solution strategies concurrently and keeps the better.
    pub portfolio: bool,
    /// Seed for randomized phases.
    pub seed: u64,
}

impl SearchConfig {
    /// Whole-run budget as a duration.
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 19_500,
            penalty_factor: 0.1,
            stagnation_limit: 64,
            first_solution: FirstSolution::CheapestInsertion,
            portfolio: true,
            seed: 0,
        }
    }
}

/// Post-optimization phases run after the search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostprocessConfig {
    /// Reorders pairs within routes to shorten carried time.
    pub polish: bool,
    /// Tail of the budget reserved for polishing, in milliseconds.
    pub polish_ms: u64,
    /// Upper bound on polishing attempts.
    pub polish_max_attempts: u64,
    /// Inserts excluded orders with relaxed windows for partial adherence.
    pub recover_late_orders: bool,
}

impl PostprocessConfig {
    /// Polishing window as a duration.
    pub fn polish_window(&self) -> Duration {
        Duration::from_millis(self.polish_ms)
    }
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            polish: true,
            polish_ms: 4_500,
            polish_max_attempts: 200_000,
            recover_late_orders: false,
        }
    }
}
