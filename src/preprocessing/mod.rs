//! Data preprocessing

pub mod feature_engineering;
pub mod normalization;

pub use feature_engineering::{FeatureEngineer, FeatureVector};
pub use normalization::PriceRange;
