//! Service and training configuration
//!
//! Every field has a default, so an empty JSON object is a valid config file.
//! Environment variables are applied on top of the file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EstateError, EstateResult};

pub const DEFAULT_HIDDEN_LAYERS: [usize; 4] = [40, 30, 20, 10];
pub const DEFAULT_MAX_ITERATIONS: usize = 100_000;
pub const DEFAULT_LEARNING_RATE: f64 = 0.002;
pub const DEFAULT_ERROR_THRESHOLD: f64 = 0.000005;
pub const DEFAULT_MOMENTUM: f64 = 0.1;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_LOG_PERIOD: usize = 10_000;
/// Upper bound on `timeout_ms`: one week.
pub const MAX_TIMEOUT_MS: u64 = 7 * 24 * 60 * 60 * 1000;

pub const CONFIG_PATH_ENV: &str = "ESTATE_ML_CONFIG";
pub const BIND_ADDR_ENV: &str = "ESTATE_ML_ADDR";
pub const DATASET_ENV: &str = "ESTATE_ML_DATASET";
pub const STORE_DIR_ENV: &str = "ESTATE_ML_STORE_DIR";
pub const ITERATIONS_ENV: &str = "ESTATE_ML_ITERATIONS";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Activation {
    #[default]
    Sigmoid,
    Relu,
    LeakyRelu,
    Tanh,
}

/// Network topology and training bounds.
///
/// Training stops at whichever comes first: `max_iterations`, the error
/// dropping below `error_threshold`, or `timeout_ms` elapsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub hidden_layers: Vec<usize>,
    pub activation: Activation,
    pub max_iterations: usize,
    pub learning_rate: f64,
    pub error_threshold: f64,
    pub momentum: f64,
    pub timeout_ms: Option<u64>,
    /// Seed for weight initialisation.
    pub seed: u64,
    /// Log progress every N iterations; 0 disables.
    pub log_period: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hidden_layers: DEFAULT_HIDDEN_LAYERS.to_vec(),
            activation: Activation::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            learning_rate: DEFAULT_LEARNING_RATE,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            momentum: DEFAULT_MOMENTUM,
            timeout_ms: None,
            seed: DEFAULT_SEED,
            log_period: DEFAULT_LOG_PERIOD,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> EstateResult<()> {
        if self.hidden_layers.is_empty() {
            return Err(config_error("at least one hidden layer is required"));
        }
        if self.hidden_layers.contains(&0) {
            return Err(config_error("hidden layers must have at least one neuron"));
        }
        if self.max_iterations == 0 {
            return Err(config_error("max_iterations must be positive"));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(config_error("learning_rate must be a positive number"));
        }
        if !self.error_threshold.is_finite() || self.error_threshold < 0.0 {
            return Err(config_error("error_threshold must be a non-negative number"));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return Err(config_error("momentum must be in [0, 1)"));
        }
        if self.timeout_ms.is_some_and(|ms| ms > MAX_TIMEOUT_MS) {
            return Err(config_error("timeout_ms must not exceed one week"));
        }
        Ok(())
    }
}

fn config_error(message: &str) -> EstateError {
    EstateError::Configuration(format!("Invalid training configuration: {}", message))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` uses the dataset bundled with the crate.
    pub dataset_path: Option<PathBuf>,
    pub store_dir: PathBuf,
    /// When false, a model cached in the store is reused instead of retraining.
    pub retrain_on_startup: bool,
    pub training: TrainingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            dataset_path: None,
            store_dir: PathBuf::from("./model-store"),
            retrain_on_startup: true,
            training: TrainingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> EstateResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// File named by `ESTATE_ML_CONFIG` (if set), then environment overrides.
    pub fn from_env() -> EstateResult<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> EstateResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(BIND_ADDR_ENV) {
            self.bind_addr = addr.parse().map_err(|_| {
                EstateError::Configuration(format!("{}: invalid address '{}'", BIND_ADDR_ENV, addr))
            })?;
        }
        if let Some(path) = lookup(DATASET_ENV) {
            self.dataset_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup(STORE_DIR_ENV) {
            self.store_dir = PathBuf::from(dir);
        }
        if let Some(iterations) = lookup(ITERATIONS_ENV) {
            self.training.max_iterations = iterations.parse().map_err(|_| {
                EstateError::Configuration(format!(
                    "{}: invalid iteration count '{}'",
                    ITERATIONS_ENV, iterations
                ))
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_published_hyperparameters() {
        let config = TrainingConfig::default();
        assert_eq!(config.hidden_layers, vec![40, 30, 20, 10]);
        assert_eq!(config.max_iterations, 100_000);
        assert_eq!(config.learning_rate, 0.002);
        assert_eq!(config.error_threshold, 0.000005);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_hyperparameters() {
        let cases = [
            TrainingConfig { hidden_layers: vec![], ..Default::default() },
            TrainingConfig { hidden_layers: vec![10, 0], ..Default::default() },
            TrainingConfig { max_iterations: 0, ..Default::default() },
            TrainingConfig { learning_rate: 0.0, ..Default::default() },
            TrainingConfig { learning_rate: f64::NAN, ..Default::default() },
            TrainingConfig { error_threshold: -1.0, ..Default::default() },
            TrainingConfig { momentum: 1.0, ..Default::default() },
            TrainingConfig { timeout_ms: Some(MAX_TIMEOUT_MS + 1), ..Default::default() },
            TrainingConfig { timeout_ms: Some(i64::MAX as u64), ..Default::default() },
            TrainingConfig { timeout_ms: Some(u64::MAX), ..Default::default() },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(EstateError::Configuration(_))),
                "{:?}",
                config
            );
        }
    }

    #[test]
    fn timeout_up_to_one_week_is_accepted() {
        for timeout_ms in [Some(0), Some(MAX_TIMEOUT_MS), None] {
            let config = TrainingConfig { timeout_ms, ..Default::default() };
            assert!(config.validate().is_ok(), "{:?}", timeout_ms);
        }
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"training": {"max_iterations": 500, "activation": "leaky-relu"}}"#)
                .unwrap();
        assert_eq!(config.training.max_iterations, 500);
        assert_eq!(config.training.activation, Activation::LeakyRelu);
        assert_eq!(config.training.learning_rate, DEFAULT_LEARNING_RATE);
        assert_eq!(config.bind_addr.port(), 8000);
        assert!(config.retrain_on_startup);
    }

    #[test]
    fn env_overrides() {
        let vars: HashMap<&str, &str> = [
            (BIND_ADDR_ENV, "127.0.0.1:9100"),
            (DATASET_ENV, "/data/homes.json"),
            (ITERATIONS_ENV, "2500"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.bind_addr.port(), 9100);
        assert_eq!(config.dataset_path, Some(PathBuf::from("/data/homes.json")));
        assert_eq!(config.training.max_iterations, 2500);
        assert_eq!(config.store_dir, PathBuf::from("./model-store"));
    }

    #[test]
    fn bad_env_value_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|key| {
            (key == ITERATIONS_ENV).then(|| "many".to_string())
        });
        assert!(matches!(result, Err(EstateError::Configuration(_))));
    }
}
