//! Engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Tunables of the job manager and its workers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Workers spawned per job
    pub num_workers: usize,
    /// Attempts between two progress reports of a worker
    pub batch_size: u64,
    /// Attempts after which a worker gives up
    pub max_attempts_per_worker: u64,
    /// How long a stop waits for workers before detaching them
    pub stop_grace_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_workers: 4,
            batch_size: 1000,
            max_attempts_per_worker: 10_000_000,
            stop_grace_ms: 2000,
        }
    }
}

impl EngineConfig {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }

    /// Parse a JSON document; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.num_workers == 0 {
            return Err(EngineError::Config("num_workers must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(EngineError::Config("batch_size must be at least 1".into()));
        }
        if self.max_attempts_per_worker == 0 {
            return Err(EngineError::Config(
                "max_attempts_per_worker must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
