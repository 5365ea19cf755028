//! Price normalization

use serde::{Deserialize, Serialize};

use crate::error::{EstateError, EstateResult};
use crate::types::PropertyRecord;

/// Global price bounds of the training dataset. Stored next to the weights,
/// predictions must be denormalized with the range the model was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn fit(records: &[PropertyRecord]) -> EstateResult<Self> {
        if records.is_empty() {
            return Err(EstateError::Configuration("Empty dataset".to_string()));
        }

        if let Some(bad) = records.iter().find(|r| !r.price.is_finite()) {
            return Err(EstateError::Configuration(format!(
                "Non-finite price {} in dataset, check the data file",
                bad.price
            )));
        }

        let min = records.iter().map(|r| r.price).fold(f64::INFINITY, f64::min);
        let max = records.iter().map(|r| r.price).fold(f64::NEG_INFINITY, f64::max);

        Ok(Self { min, max })
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// All prices are equal; `normalize` would divide by zero.
    pub fn is_degenerate(&self) -> bool {
        self.span() == 0.0
    }

    pub fn normalize(&self, price: f64) -> f64 {
        (price - self.min) / self.span()
    }

    pub fn denormalize(&self, value: f64) -> f64 {
        value * self.span() + self.min
    }
}
