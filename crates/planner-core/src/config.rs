use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{PlannerError, PlannerResult};

/// Tunables for scheduling and advisory calculations.
///
/// All durations and lags are expressed in hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Duration assumed for tasks without an estimate
    pub default_task_hours: f64,
    /// Float at or below this magnitude counts as zero
    pub float_tolerance: f64,
    /// Critical tasks at least this long are decomposition candidates
    pub long_task_hours: f64,
    /// Critical edges with at least this much lag are flagged for review
    pub lag_review_hours: f64,
    /// Edges with at least this much lag are treated as external constraints
    pub external_lag_hours: f64,
    /// Lag threshold used by the risk assessment for external constraints
    pub risk_external_lag_hours: f64,
    /// Duration multiplier applied to decomposition candidates when estimating savings
    pub split_factor: f64,
    /// Most critical chains listed per schedule; the critical path and
    /// critical edges are always complete
    pub max_critical_chains: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_task_hours: 8.0,
            float_tolerance: 0.01,
            long_task_hours: 40.0,
            lag_review_hours: 24.0,
            external_lag_hours: 48.0,
            risk_external_lag_hours: 24.0,
            split_factor: 0.5,
            max_critical_chains: 32,
        }
    }
}

impl EngineConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/planner/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("planner/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("planner\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    /// Load the user config, falling back to defaults when absent or unreadable
    pub fn load() -> Self {
        if let Some(config_path) = Self::config_path() {
            if config_path.exists() {
                if let Ok(config) = Self::load_from(&config_path) {
                    return config;
                }
            }
        }
        Self::default()
    }

    pub fn load_from(path: &Path) -> PlannerResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> PlannerResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| PlannerError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> PlannerResult<()> {
        if self.default_task_hours < 0.0 {
            return Err(PlannerError::Serialization(
                "default_task_hours must not be negative".to_string(),
            ));
        }
        if self.float_tolerance < 0.0 {
            return Err(PlannerError::Serialization(
                "float_tolerance must not be negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.split_factor) {
            return Err(PlannerError::Serialization(
                "split_factor must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("long_task_hours = 16.0\n").unwrap();
        assert_eq!(config.long_task_hours, 16.0);
        assert_eq!(config.default_task_hours, 8.0);
        assert_eq!(config.float_tolerance, 0.01);
        assert_eq!(config.max_critical_chains, 32);
    }

    #[test]
    fn test_rejects_out_of_range_split_factor() {
        let result = EngineConfig::from_toml_str("split_factor = 1.5\n");
        assert!(matches!(result, Err(PlannerError::Serialization(_))));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(EngineConfig::from_toml_str("long_task_hours = \"many\"").is_err());
    }
}
