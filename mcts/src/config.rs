//! Search configuration parameters.

use std::time::Duration;

use crate::search::SearchError;

/// Budgets and tunables for one search.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Hard cap on iterations per search.
    pub max_iterations: u32,

    /// Wall-clock budget per search. Soft: checked between iterations, so
    /// an in-progress iteration always completes.
    pub max_time: Duration,

    /// Exploration constant in the PUCT rule. Higher values spread visits
    /// across the priors; lower values trust the empirical scores sooner.
    pub cpuct: f64,

    /// Seed for the rollout RNG. `None` seeds from the OS; tests pin it for
    /// reproducible searches.
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 15_000,
            max_time: Duration::from_secs(5),
            cpuct: 2.0,
            seed: None,
        }
    }
}

impl SearchConfig {
    /// Build a config from the daemon's numeric arguments, validating them.
    pub fn from_budgets(
        max_iterations: u32,
        max_seconds: f64,
        cpuct: f64,
    ) -> Result<Self, SearchError> {
        if !max_seconds.is_finite() || max_seconds < 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "max_seconds must be a non-negative number, got {max_seconds}"
            )));
        }
        let config = Self {
            max_iterations,
            max_time: Duration::from_secs_f64(max_seconds),
            cpuct,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_iterations == 0 {
            return Err(SearchError::InvalidConfig(
                "max_iterations must be positive".to_string(),
            ));
        }
        if self.max_time.is_zero() {
            return Err(SearchError::InvalidConfig(
                "max_time must be positive".to_string(),
            ));
        }
        if !self.cpuct.is_finite() || self.cpuct < 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "cpuct must be a non-negative number, got {}",
                self.cpuct
            )));
        }
        Ok(())
    }

    /// Small deterministic budget for tests.
    pub fn for_testing() -> Self {
        Self {
            max_iterations: 200,
            max_time: Duration::from_secs(60),
            cpuct: 1.0,
            seed: Some(42),
        }
    }

    pub fn with_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_time(mut self, max_time: Duration) -> Self {
        self.max_time = max_time;
        self
    }

    pub fn with_cpuct(mut self, cpuct: f64) -> Self {
        self.cpuct = cpuct;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
