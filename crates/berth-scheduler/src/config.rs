use crate::{Result, SchedulerError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default scheduler name pods must request to be claimed
pub const DEFAULT_SCHEDULER_NAME: &str = "berth-scheduler";

/// Weights of the node scoring function
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoringWeights {
    /// Weight of spare resource capacity
    pub alpha: f64,
    /// Weight of the traffic cost penalty
    pub beta: f64,
    /// Weight of the saturation penalty
    pub gamma: f64,
    /// Multiplier applied to CPU millicores
    pub cpu_factor: f64,
    /// Multiplier applied to memory MiB
    pub memory_factor: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            beta: 0.3,
            gamma: 0.2,
            cpu_factor: 1.0,
            memory_factor: 0.5,
        }
    }
}

/// Configuration for the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerConfig {
    /// Only pods whose `schedulerName` equals this are claimed
    pub scheduler_name: String,
    /// Server-side idle timeout of one watch connection
    pub watch_timeout_secs: u64,
    /// Delay before reconnecting after the watch ends
    pub retry_delay_ms: u64,
    pub scoring: ScoringWeights,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scheduler_name: DEFAULT_SCHEDULER_NAME.to_string(),
            watch_timeout_secs: 10,
            retry_delay_ms: 5000,
            scoring: ScoringWeights::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn watch_timeout(&self) -> Duration {
        Duration::from_secs(self.watch_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Load a YAML config file; keys left out keep their defaults
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| {
            SchedulerError::invalid_config(
                format!("Failed to read config file '{}': {}", path.display(), e),
                "Check that the file exists and is readable",
            )
        })?;

        let config: Self = berth_core::from_yaml(&data)?;
        Ok(config)
    }

    /// Reject configurations the scheduler cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.scheduler_name.trim().is_empty() {
            return Err(SchedulerError::invalid_config(
                "scheduler name is empty",
                "Set schedulerName to the value pods put in spec.schedulerName",
            ));
        }

        if self.watch_timeout_secs == 0 {
            return Err(SchedulerError::invalid_config(
                "watch timeout must be at least one second",
                "Set watchTimeoutSecs to a positive value, e.g. 10",
            ));
        }

        let w = &self.scoring;
        for (name, value) in [
            ("alpha", w.alpha),
            ("beta", w.beta),
            ("gamma", w.gamma),
            ("cpuFactor", w.cpu_factor),
            ("memoryFactor", w.memory_factor),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SchedulerError::invalid_config(
                    format!("scoring weight {} = {} is not a finite non-negative number", name, value),
                    "Scoring weights must be finite and >= 0",
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.scheduler_name, DEFAULT_SCHEDULER_NAME);
        assert_eq!(config.watch_timeout(), Duration::from_secs(10));
        assert_eq!(config.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.scoring.alpha, 0.5);
        assert_eq!(config.scoring.beta, 0.3);
        assert_eq!(config.scoring.gamma, 0.2);
        assert_eq!(config.scoring.cpu_factor, 1.0);
        assert_eq!(config.scoring.memory_factor, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "schedulerName: gpu-scheduler\nretryDelayMs: 250\nscoring:\n  gamma: 0.7\n"
        )
        .unwrap();

        let config = SchedulerConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.scheduler_name, "gpu-scheduler");
        assert_eq!(config.retry_delay(), Duration::from_millis(250));
        assert_eq!(config.watch_timeout_secs, 10);
        assert_eq!(config.scoring.gamma, 0.7);
        assert_eq!(config.scoring.alpha, 0.5);
    }

    #[test]
    fn test_missing_file() {
        let result = SchedulerConfig::from_yaml_file(Path::new("/nonexistent/berth.yaml"));
        assert!(matches!(result, Err(SchedulerError::InvalidConfig { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SchedulerConfig {
            scheduler_name: " ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SchedulerConfig {
            watch_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let mut config = SchedulerConfig::default();
        config.scoring.beta = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = SchedulerConfig::default();
        config.scoring.alpha = -1.0;
        assert!(config.validate().is_err());
    }
}
