//! Feed-forward network behind a narrow trainable interface
//!
//! The encoder, scaler and predictor only talk to [`Network`], so the
//! multi-layer perceptron below can be swapped for another implementation
//! without touching them.

use chrono::Utc;
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::{Activation, TrainingConfig};
use crate::error::{EstateError, EstateResult};
use crate::types::TrainingReport;

/// Initial weights and biases are drawn from `[-INIT_WEIGHT, INIT_WEIGHT)`.
const INIT_WEIGHT: f64 = 0.2;
const LEAKY_RELU_SLOPE: f64 = 0.01;

pub trait Network {
    type Model: Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Checks that the network can be built with `config`. Called before any
    /// training work starts.
    fn validate(&self, config: &TrainingConfig) -> EstateResult<()>;

    fn train(
        &self,
        inputs: &Array2<f64>,
        targets: &Array1<f64>,
        config: &TrainingConfig,
    ) -> EstateResult<(Self::Model, TrainingReport)>;

    /// Single scalar output, or `None` if the model cannot produce one.
    fn run(&self, model: &Self::Model, input: &Array1<f64>) -> Option<f64>;
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Sigmoid => sigmoid(x),
            Activation::Relu => x.max(0.0),
            Activation::LeakyRelu => {
                if x > 0.0 {
                    x
                } else {
                    LEAKY_RELU_SLOPE * x
                }
            }
            Activation::Tanh => x.tanh(),
        }
    }

    /// Derivative expressed through the activated value.
    fn derivative(self, output: f64) -> f64 {
        match self {
            Activation::Sigmoid => output * (1.0 - output),
            Activation::Relu => {
                if output > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyRelu => {
                if output > 0.0 {
                    1.0
                } else {
                    LEAKY_RELU_SLOPE
                }
            }
            Activation::Tanh => 1.0 - output * output,
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Weights and topology of a trained perceptron. The output layer is always a
/// single sigmoid unit, so outputs stay in (0, 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceptronModel {
    pub sizes: Vec<usize>,
    pub activation: Activation,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
}

impl PerceptronModel {
    fn new<R: Rng>(sizes: &[usize], activation: Activation, rng: &mut R) -> Self {
        let weights = sizes
            .windows(2)
            .map(|pair| {
                Array2::from_shape_fn((pair[1], pair[0]), |_| {
                    rng.gen_range(-INIT_WEIGHT..INIT_WEIGHT)
                })
            })
            .collect();
        let biases = sizes[1..]
            .iter()
            .map(|&n| Array1::from_shape_fn(n, |_| rng.gen_range(-INIT_WEIGHT..INIT_WEIGHT)))
            .collect();

        Self {
            sizes: sizes.to_vec(),
            activation,
            weights,
            biases,
        }
    }

    pub fn n_inputs(&self) -> usize {
        self.sizes.first().copied().unwrap_or(0)
    }

    /// Activations of every layer, input included.
    fn forward_trace(&self, input: ArrayView1<f64>) -> Vec<Array1<f64>> {
        let last = self.weights.len().saturating_sub(1);
        let mut outputs = Vec::with_capacity(self.weights.len() + 1);
        outputs.push(input.to_owned());

        for (layer, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let z = w.dot(&outputs[layer]) + b;
            let activated = if layer == last {
                z.mapv_into(sigmoid)
            } else {
                let activation = self.activation;
                z.mapv_into(|x| activation.apply(x))
            };
            outputs.push(activated);
        }

        outputs
    }

    pub fn run(&self, input: ArrayView1<f64>) -> Option<f64> {
        if input.len() != self.n_inputs() {
            return None;
        }
        self.forward_trace(input)
            .last()
            .and_then(|output| output.get(0).copied())
    }

    /// One online backpropagation step; returns the squared error before the
    /// update.
    fn train_sample(
        &mut self,
        input: ArrayView1<f64>,
        target: f64,
        config: &TrainingConfig,
        changes: &mut [Array2<f64>],
    ) -> f64 {
        let outputs = self.forward_trace(input);
        let n_layers = self.weights.len();
        let output = outputs[n_layers][0];
        let error = target - output;

        let mut delta = Array1::from_elem(1, error * output * (1.0 - output));

        for layer in (0..n_layers).rev() {
            // Propagate through the weights before they are updated.
            let previous_delta = if layer > 0 {
                let activation = self.activation;
                let derivative = outputs[layer].mapv(|a| activation.derivative(a));
                Some(self.weights[layer].t().dot(&delta) * &derivative)
            } else {
                None
            };

            let gradient = delta
                .view()
                .insert_axis(Axis(1))
                .dot(&outputs[layer].view().insert_axis(Axis(0)));
            let change = gradient * config.learning_rate + &changes[layer] * config.momentum;
            self.weights[layer] += &change;
            changes[layer] = change;
            self.biases[layer].scaled_add(config.learning_rate, &delta);

            if let Some(next) = previous_delta {
                delta = next;
            }
        }

        error * error
    }
}

/// Multi-layer perceptron trained with online gradient descent and momentum.
#[derive(Debug, Clone, Copy, Default)]
pub struct Perceptron;

impl Network for Perceptron {
    type Model = PerceptronModel;

    fn validate(&self, config: &TrainingConfig) -> EstateResult<()> {
        config.validate()
    }

    fn train(
        &self,
        inputs: &Array2<f64>,
        targets: &Array1<f64>,
        config: &TrainingConfig,
    ) -> EstateResult<(PerceptronModel, TrainingReport)> {
        self.validate(config)?;

        let n_samples = inputs.nrows();
        if n_samples == 0 || inputs.ncols() == 0 {
            return Err(EstateError::Configuration("Empty training set".to_string()));
        }
        if targets.len() != n_samples {
            return Err(EstateError::Configuration(format!(
                "{} samples but {} targets",
                n_samples,
                targets.len()
            )));
        }

        let mut sizes = vec![inputs.ncols()];
        sizes.extend_from_slice(&config.hidden_layers);
        sizes.push(1);

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut model = PerceptronModel::new(&sizes, config.activation, &mut rng);
        let mut changes: Vec<Array2<f64>> = model
            .weights
            .iter()
            .map(|w| Array2::zeros(w.raw_dim()))
            .collect();

        let started = Utc::now();
        let deadline = match config.timeout_ms {
            Some(ms) => Some(
                i64::try_from(ms)
                    .ok()
                    .and_then(chrono::Duration::try_milliseconds)
                    .and_then(|timeout| started.checked_add_signed(timeout))
                    .ok_or_else(|| {
                        EstateError::Configuration(format!("Training timeout out of range: {} ms", ms))
                    })?,
            ),
            None => None,
        };

        let mut error = f64::INFINITY;
        let mut iterations = 0;
        let mut timed_out = false;

        while iterations < config.max_iterations && error > config.error_threshold {
            let mut sum = 0.0;
            for (row, &target) in inputs.rows().into_iter().zip(targets.iter()) {
                sum += model.train_sample(row, target, config, &mut changes);
            }
            error = sum / n_samples as f64;
            iterations += 1;

            if !error.is_finite() {
                return Err(EstateError::Configuration(format!(
                    "Training diverged after {} iterations, lower the learning rate",
                    iterations
                )));
            }

            if config.log_period > 0 && iterations % config.log_period == 0 {
                tracing::debug!(iterations, error, "Training progress");
            }

            if deadline.is_some_and(|deadline| Utc::now() >= deadline) {
                timed_out = true;
                break;
            }
        }

        if timed_out {
            tracing::warn!(iterations, error, "Training stopped by timeout");
        }

        let report = TrainingReport {
            iterations,
            error,
            converged: error <= config.error_threshold,
            elapsed_ms: (Utc::now() - started).num_milliseconds().max(0) as u64,
        };

        Ok((model, report))
    }

    fn run(&self, model: &PerceptronModel, input: &Array1<f64>) -> Option<f64> {
        model.run(input.view())
    }
}
