//! Data types for the estimation pipeline

use serde::{Deserialize, Deserializer, Serialize};

/// Where a property is located. Unrecognised labels are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Location {
    Downtown,
    Suburban,
    Rural,
    Other(String),
}

impl Location {
    pub fn label(&self) -> &str {
        match self {
            Location::Downtown => "Downtown",
            Location::Suburban => "Suburban",
            Location::Rural => "Rural",
            Location::Other(label) => label.as_str(),
        }
    }

    /// Case-insensitive comparison against a raw label, used by the
    /// actual-price lookup.
    pub fn matches_label(&self, label: &str) -> bool {
        self.label().eq_ignore_ascii_case(label)
    }
}

impl From<&str> for Location {
    fn from(label: &str) -> Self {
        match label {
            "Downtown" => Location::Downtown,
            "Suburban" => Location::Suburban,
            "Rural" => Location::Rural,
            other => Location::Other(other.to_string()),
        }
    }
}

impl From<String> for Location {
    fn from(label: String) -> Self {
        Location::from(label.as_str())
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        match location {
            Location::Other(label) => label,
            known => known.label().to_string(),
        }
    }
}

/// One labeled row of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    #[serde(rename = "Area (sq ft)")]
    pub area: f64,
    #[serde(rename = "Bedrooms")]
    pub bedrooms: u32,
    #[serde(rename = "Bathrooms")]
    pub bathrooms: u32,
    #[serde(rename = "Age of Property (years)")]
    pub age: f64,
    #[serde(rename = "Location")]
    pub location: Location,
    #[serde(rename = "Price (in $1000)")]
    pub price: f64, // in $1000
}

/// Form input as submitted, before numeric parsing. Numeric fields accept
/// either a string or a JSON number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawQuery {
    #[serde(default, deserialize_with = "text_or_number")]
    pub area: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub bedrooms: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub bathrooms: String,
    #[serde(default, deserialize_with = "text_or_number")]
    pub age: String,
    #[serde(default = "default_location")]
    pub location: String,
}

fn default_location() -> String {
    "Downtown".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldValue {
    Text(String),
    Number(serde_json::Number),
}

fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match FieldValue::deserialize(deserializer)? {
        FieldValue::Text(text) => text,
        FieldValue::Number(number) => number.to_string(),
    })
}

impl RawQuery {
    pub fn new(
        area: impl Into<String>,
        bedrooms: impl Into<String>,
        bathrooms: impl Into<String>,
        age: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            area: area.into(),
            bedrooms: bedrooms.into(),
            bathrooms: bathrooms.into(),
            age: age.into(),
            location: location.into(),
        }
    }
}

/// A query whose numeric fields have been parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyQuery {
    pub area: f64,
    pub bedrooms: f64,
    pub bathrooms: f64,
    pub age: f64,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub price: f64,
    /// Price with two decimals, as displayed.
    pub formatted: String,
}

/// One point of the actual-vs-predicted chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// `None` when no dataset record matches the query.
    pub actual_price: Option<f64>,
    pub predicted_price: f64,
    pub label: String,
}

/// Parallel sequences consumed by the chart widget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub actual_prices: Vec<Option<f64>>,
    pub predicted_prices: Vec<f64>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub iterations: usize,
    pub error: f64,
    /// Error fell below the threshold before the iteration cap or timeout.
    pub converged: bool,
    pub elapsed_ms: u64,
}
