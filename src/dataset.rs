//! Property dataset loading and actual-price lookup

use std::path::Path;

use crate::error::{EstateError, EstateResult};
use crate::types::{PropertyQuery, PropertyRecord};

/// Dataset shipped with the crate.
const BUNDLED_DATASET: &str = include_str!("../data/real_estate.json");

/// Area tolerance (sq ft) when matching a query against dataset records.
pub const AREA_TOLERANCE: f64 = 10.0;

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<PropertyRecord>,
}

impl Dataset {
    pub fn new(records: Vec<PropertyRecord>) -> Self {
        Self { records }
    }

    pub fn bundled() -> EstateResult<Self> {
        Self::from_json(BUNDLED_DATASET)
    }

    pub fn from_json(json: &str) -> EstateResult<Self> {
        let records: Vec<PropertyRecord> = serde_json::from_str(json).map_err(|e| {
            EstateError::Configuration(format!("Malformed dataset: {}", e))
        })?;
        Ok(Self::new(records))
    }

    pub fn load(path: &Path) -> EstateResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EstateError::Configuration(format!("Cannot read dataset {}: {}", path.display(), e))
        })?;
        let dataset = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), records = dataset.len(), "Dataset loaded");
        Ok(dataset)
    }

    /// Loads `path` if given, the bundled dataset otherwise.
    pub fn load_or_bundled(path: Option<&Path>) -> EstateResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let dataset = Self::bundled()?;
                tracing::info!(records = dataset.len(), "Bundled dataset loaded");
                Ok(dataset)
            }
        }
    }

    pub fn records(&self) -> &[PropertyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Price of the first record matching the query: area within
    /// [`AREA_TOLERANCE`], equal rooms and age, location compared without case.
    pub fn find_actual_price(&self, query: &PropertyQuery) -> Option<f64> {
        self.records
            .iter()
            .find(|r| {
                (r.area - query.area).abs() < AREA_TOLERANCE
                    && r.bedrooms as f64 == query.bedrooms
                    && r.bathrooms as f64 == query.bathrooms
                    && r.age == query.age
                    && r.location.matches_label(&query.location)
            })
            .map(|r| r.price)
    }
}
