//! Network, training and prediction

pub mod network;
pub mod predictor;
pub mod trainer;

pub use network::{Network, Perceptron, PerceptronModel};
pub use predictor::Predictor;
pub use trainer::{TrainedModel, Trainer};
