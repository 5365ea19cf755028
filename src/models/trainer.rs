//! Training of the price network and persistence of the result

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TrainingConfig;
use crate::dataset::Dataset;
use crate::error::{EstateError, EstateResult};
use crate::models::network::{Network, Perceptron};
use crate::preprocessing::{FeatureEngineer, PriceRange};
use crate::store::{ModelStore, MODEL_KEY};
use crate::types::TrainingReport;

/// Network weights together with the price range they were trained on.
/// This whole snapshot is what gets persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel<M> {
    pub network: M,
    pub price_range: PriceRange,
    pub report: TrainingReport,
    pub trained_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Trainer<N: Network = Perceptron> {
    network: N,
    config: TrainingConfig,
    store: Arc<dyn ModelStore>,
}

impl<N: Network> Trainer<N> {
    pub fn new(network: N, config: TrainingConfig, store: Arc<dyn ModelStore>) -> Self {
        Self {
            network,
            config,
            store,
        }
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Validates the configuration and the dataset's price range without
    /// training. Everything `train` would reject as a configuration error is
    /// caught here.
    pub fn prepare(&self, dataset: &Dataset) -> EstateResult<PriceRange> {
        self.network.validate(&self.config)?;

        let range = PriceRange::fit(dataset.records())?;
        if range.is_degenerate() {
            return Err(EstateError::Configuration(format!(
                "All prices equal {}, cannot normalize",
                range.min
            )));
        }

        Ok(range)
    }

    pub fn train(&self, dataset: &Dataset) -> EstateResult<TrainedModel<N::Model>> {
        let price_range = self.prepare(dataset)?;
        let (features, targets) = FeatureEngineer::encode_dataset(dataset.records(), &price_range);

        tracing::info!(
            samples = features.nrows(),
            hidden_layers = ?self.config.hidden_layers,
            max_iterations = self.config.max_iterations,
            learning_rate = self.config.learning_rate,
            error_threshold = self.config.error_threshold,
            "Training model"
        );

        let (network, report) = self.network.train(&features, &targets, &self.config)?;

        tracing::info!(
            iterations = report.iterations,
            error = report.error,
            converged = report.converged,
            elapsed_ms = report.elapsed_ms,
            "Model trained"
        );

        let trained = TrainedModel {
            network,
            price_range,
            report,
            trained_at: Utc::now(),
        };

        self.store.set(MODEL_KEY, &serde_json::to_string(&trained)?)?;
        tracing::info!(key = MODEL_KEY, "Model stored");

        Ok(trained)
    }

    /// Snapshot from the store, if one was saved earlier.
    pub fn load_cached(&self) -> EstateResult<Option<TrainedModel<N::Model>>> {
        match self.store.get(MODEL_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{Location, PropertyRecord};

    fn fast_config() -> TrainingConfig {
        TrainingConfig {
            hidden_layers: vec![6],
            max_iterations: 300,
            learning_rate: 0.3,
            log_period: 0,
            ..TrainingConfig::default()
        }
    }

    fn dataset(prices: &[f64]) -> Dataset {
        let records = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| PropertyRecord {
                area: 1000.0 + 500.0 * i as f64,
                bedrooms: 2 + i as u32,
                bathrooms: 1,
                age: 5.0,
                location: Location::Suburban,
                price,
            })
            .collect();
        Dataset::new(records)
    }

    #[test]
    fn train_persists_snapshot_with_range() {
        let store = Arc::new(MemoryStore::new());
        let trainer = Trainer::new(Perceptron, fast_config(), store.clone());

        let trained = trainer.train(&dataset(&[200.0, 350.0, 500.0])).unwrap();
        assert_eq!(trained.price_range, PriceRange { min: 200.0, max: 500.0 });
        assert_eq!(trained.network.sizes, vec![7, 6, 1]);

        let cached = trainer.load_cached().unwrap().unwrap();
        assert_eq!(cached.price_range, trained.price_range);
        assert_eq!(cached.report.iterations, trained.report.iterations);
        assert!(store.get(MODEL_KEY).unwrap().is_some());
    }

    #[test]
    fn retraining_overwrites_the_stored_model() {
        let store = Arc::new(MemoryStore::new());
        let first = Trainer::new(Perceptron, fast_config(), store.clone());
        first.train(&dataset(&[200.0, 350.0])).unwrap();

        let second = Trainer::new(
            Perceptron,
            TrainingConfig {
                hidden_layers: vec![3],
                ..fast_config()
            },
            store,
        );
        second.train(&dataset(&[100.0, 900.0])).unwrap();

        let cached = first.load_cached().unwrap().unwrap();
        assert_eq!(cached.network.sizes, vec![7, 3, 1]);
        assert_eq!(cached.price_range.max, 900.0);
    }

    #[test]
    fn empty_dataset_fails_before_training() {
        let store = Arc::new(MemoryStore::new());
        let trainer = Trainer::new(Perceptron, fast_config(), store.clone());

        let err = trainer.train(&Dataset::new(Vec::new())).unwrap_err();
        assert!(matches!(err, EstateError::Configuration(_)));
        assert!(store.get(MODEL_KEY).unwrap().is_none());
    }

    #[test]
    fn equal_prices_are_rejected() {
        let trainer = Trainer::new(Perceptron, fast_config(), Arc::new(MemoryStore::new()));
        assert!(matches!(
            trainer.prepare(&dataset(&[250.0, 250.0])),
            Err(EstateError::Configuration(_))
        ));
    }

    #[test]
    fn invalid_hyperparameters_fail_fast() {
        let config = TrainingConfig {
            learning_rate: -0.1,
            ..fast_config()
        };
        let trainer = Trainer::new(Perceptron, config, Arc::new(MemoryStore::new()));
        assert!(matches!(
            trainer.train(&dataset(&[100.0, 200.0])),
            Err(EstateError::Configuration(_))
        ));
    }

    #[test]
    fn nothing_cached_initially() {
        let trainer = Trainer::new(Perceptron, fast_config(), Arc::new(MemoryStore::new()));
        assert!(trainer.load_cached().unwrap().is_none());
    }
}
