//! Single-query price prediction

use crate::error::{EstateError, EstateResult};
use crate::models::network::Network;
use crate::models::trainer::TrainedModel;
use crate::preprocessing::FeatureEngineer;
use crate::types::{Location, Prediction, PropertyQuery, RawQuery};

fn parse_field(field: &'static str, value: &str) -> EstateResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(EstateError::InvalidInput { field })
}

impl RawQuery {
    pub fn parse(&self) -> EstateResult<PropertyQuery> {
        Ok(PropertyQuery {
            area: parse_field("area", &self.area)?,
            bedrooms: parse_field("bedrooms", &self.bedrooms)?,
            bathrooms: parse_field("bathrooms", &self.bathrooms)?,
            age: parse_field("age", &self.age)?,
            location: self.location.clone(),
        })
    }
}

pub struct Predictor<'a, N: Network> {
    network: &'a N,
    model: &'a TrainedModel<N::Model>,
}

impl<'a, N: Network> Predictor<'a, N> {
    pub fn new(network: &'a N, model: &'a TrainedModel<N::Model>) -> Self {
        Self { network, model }
    }

    pub fn predict(&self, query: &RawQuery) -> EstateResult<Prediction> {
        let parsed = query.parse()?;
        self.predict_parsed(&parsed)
    }

    pub fn predict_parsed(&self, query: &PropertyQuery) -> EstateResult<Prediction> {
        let features = FeatureEngineer::encode(
            query.area,
            query.bedrooms,
            query.bathrooms,
            query.age,
            &Location::from(query.location.as_str()),
        );
        tracing::debug!(?features, "Model input");

        let output = self
            .network
            .run(&self.model.network, &features.to_array())
            .filter(|v| v.is_finite())
            .ok_or(EstateError::InvalidPrediction)?;
        tracing::debug!(output, "Raw model output");

        let price = self.model.price_range.denormalize(output);
        Ok(Prediction {
            price,
            formatted: format!("{:.2}", price),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainingConfig;
    use crate::preprocessing::PriceRange;
    use crate::types::TrainingReport;
    use chrono::Utc;
    use ndarray::{Array1, Array2};
    use std::cell::Cell;

    /// Returns a fixed output and counts how often it was run.
    struct FixedNetwork {
        output: Option<f64>,
        runs: Cell<usize>,
    }

    impl FixedNetwork {
        fn new(output: Option<f64>) -> Self {
            Self {
                output,
                runs: Cell::new(0),
            }
        }
    }

    impl Network for FixedNetwork {
        type Model = ();

        fn validate(&self, _config: &TrainingConfig) -> EstateResult<()> {
            Ok(())
        }

        fn train(
            &self,
            _inputs: &Array2<f64>,
            _targets: &Array1<f64>,
            _config: &TrainingConfig,
        ) -> EstateResult<((), TrainingReport)> {
            unreachable!("not trained in these tests")
        }

        fn run(&self, _model: &(), input: &Array1<f64>) -> Option<f64> {
            assert_eq!(input.len(), 7);
            self.runs.set(self.runs.get() + 1);
            self.output
        }
    }

    fn model() -> TrainedModel<()> {
        TrainedModel {
            network: (),
            price_range: PriceRange { min: 300.0, max: 450.0 },
            report: TrainingReport {
                iterations: 1,
                error: 0.0,
                converged: true,
                elapsed_ms: 0,
            },
            trained_at: Utc::now(),
        }
    }

    fn query() -> RawQuery {
        RawQuery::new("2000", "3", "2", "10", "Downtown")
    }

    #[test]
    fn denormalizes_and_formats() {
        let network = FixedNetwork::new(Some(0.5));
        let model = model();
        let prediction = Predictor::new(&network, &model).predict(&query()).unwrap();
        assert_eq!(prediction.price, 375.0);
        assert_eq!(prediction.formatted, "375.00");
    }

    #[test]
    fn formatting_rounds_to_two_decimals() {
        let network = FixedNetwork::new(Some(0.123456));
        let model = model();
        let prediction = Predictor::new(&network, &model).predict(&query()).unwrap();
        assert_eq!(prediction.formatted, "318.52");
    }

    #[test]
    fn non_numeric_input_skips_the_model() {
        let network = FixedNetwork::new(Some(0.5));
        let model = model();
        let mut q = query();
        q.area = "abc".to_string();

        let err = Predictor::new(&network, &model).predict(&q).unwrap_err();
        assert!(matches!(err, EstateError::InvalidInput { field: "area" }));
        assert_eq!(network.runs.get(), 0);
    }

    #[test]
    fn blank_and_infinite_fields_are_invalid() {
        let mut q = query();
        q.age = "  ".to_string();
        assert!(matches!(q.parse(), Err(EstateError::InvalidInput { field: "age" })));

        let mut q = query();
        q.bathrooms = "inf".to_string();
        assert!(matches!(q.parse(), Err(EstateError::InvalidInput { field: "bathrooms" })));
    }

    #[test]
    fn surrounding_whitespace_is_accepted() {
        let q = RawQuery::new(" 1850.5 ", "2", "1", "0", "Rural");
        let parsed = q.parse().unwrap();
        assert_eq!(parsed.area, 1850.5);
        assert_eq!(parsed.age, 0.0);
    }

    #[test]
    fn missing_or_nan_output_is_invalid_prediction() {
        let model = model();
        for output in [None, Some(f64::NAN)] {
            let network = FixedNetwork::new(output);
            let err = Predictor::new(&network, &model).predict(&query()).unwrap_err();
            assert!(matches!(err, EstateError::InvalidPrediction));
        }
    }
}
