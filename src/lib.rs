//! estate-ml - property price estimation library

pub mod api;
pub mod config;
pub mod dataset;
pub mod error;
pub mod models;
pub mod preprocessing;
pub mod session;
pub mod store;
pub mod types;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use config::{AppConfig, TrainingConfig};
pub use dataset::Dataset;
pub use error::{EstateError, EstateResult};
pub use models::*;
pub use preprocessing::*;
pub use session::PredictionSession;
pub use store::{FileStore, MemoryStore, ModelStore, MODEL_KEY};
pub use types::*;
