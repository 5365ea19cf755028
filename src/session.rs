//! Prediction session: trained model, dataset and chart history for one
//! application run

use std::sync::Arc;

use crate::dataset::Dataset;
use crate::error::{EstateError, EstateResult};
use crate::models::network::{Network, Perceptron};
use crate::models::predictor::Predictor;
use crate::models::trainer::{TrainedModel, Trainer};
use crate::types::{ChartSeries, Prediction, PredictionRecord, RawQuery};

pub struct PredictionSession<N: Network = Perceptron> {
    dataset: Arc<Dataset>,
    trainer: Trainer<N>,
    model: Option<TrainedModel<N::Model>>,
    history: Vec<PredictionRecord>,
}

impl<N: Network> PredictionSession<N> {
    /// A session without a model; call [`train`](Self::train) or
    /// [`install`](Self::install) before predicting.
    pub fn new(dataset: Dataset, trainer: Trainer<N>) -> Self {
        Self {
            dataset: Arc::new(dataset),
            trainer,
            model: None,
            history: Vec::new(),
        }
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn trainer(&self) -> &Trainer<N> {
        &self.trainer
    }

    pub fn model(&self) -> Option<&TrainedModel<N::Model>> {
        self.model.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }

    /// Replaces the current model. The chart history is kept.
    pub fn install(&mut self, model: TrainedModel<N::Model>) {
        self.model = Some(model);
    }

    pub fn train(&mut self) -> EstateResult<&TrainedModel<N::Model>> {
        let trained = self.trainer.train(&self.dataset)?;
        Ok(self.model.insert(trained))
    }

    /// Installs the stored snapshot if there is one, trains otherwise.
    pub fn restore_or_train(&mut self) -> EstateResult<&TrainedModel<N::Model>> {
        match self.trainer.load_cached() {
            Ok(Some(cached)) => {
                tracing::info!(trained_at = %cached.trained_at, "Using cached model");
                Ok(self.model.insert(cached))
            }
            Ok(None) => self.train(),
            Err(e) => {
                tracing::warn!("Cached model unusable, retraining: {}", e);
                self.train()
            }
        }
    }

    pub fn predict(&self, query: &RawQuery) -> EstateResult<Prediction> {
        let model = self.model.as_ref().ok_or(EstateError::ModelNotReady)?;
        Predictor::new(self.trainer.network(), model).predict(query)
    }

    /// Predicts, looks up the actual price and appends a chart point.
    /// Nothing is appended when the prediction fails.
    pub fn submit(&mut self, query: &RawQuery) -> EstateResult<PredictionRecord> {
        let model = self.model.as_ref().ok_or(EstateError::ModelNotReady)?;
        let parsed = query.parse()?;
        let prediction = Predictor::new(self.trainer.network(), model).predict_parsed(&parsed)?;
        let actual_price = self.dataset.find_actual_price(&parsed);

        tracing::info!(
            predicted = %prediction.formatted,
            actual = ?actual_price,
            "Prediction"
        );

        let record = PredictionRecord {
            actual_price,
            predicted_price: prediction.price,
            label: format!("Prediction {}", self.history.len() + 1),
        };
        self.history.push(record.clone());
        Ok(record)
    }

    pub fn history(&self) -> &[PredictionRecord] {
        &self.history
    }

    pub fn chart(&self) -> ChartSeries {
        let mut series = ChartSeries::default();
        for record in &self.history {
            series.actual_prices.push(record.actual_price);
            series.predicted_prices.push(record.predicted_price);
            series.labels.push(record.label.clone());
        }
        series
    }
}
