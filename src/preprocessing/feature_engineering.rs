//! Feature engineering for the price network

use ndarray::{Array1, Array2};

use crate::preprocessing::normalization::PriceRange;
use crate::types::{Location, PropertyRecord};

pub const AREA_SCALE: f64 = 5000.0;
pub const BEDROOMS_SCALE: f64 = 5.0;
pub const BATHROOMS_SCALE: f64 = 3.0;
pub const AGE_SCALE: f64 = 50.0;

/// Multiplier applied to the one-hot location components so the categorical
/// signal is comparable to the scaled continuous features.
pub const LOCATION_BOOST: f64 = 10.0;

/// Number of inputs the network receives.
pub const N_FEATURES: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub area: f64,
    pub bedrooms: f64,
    pub bathrooms: f64,
    pub age: f64,
    pub loc0: f64,
    pub loc1: f64,
    pub loc2: f64,
}

impl FeatureVector {
    pub fn to_array(&self) -> Array1<f64> {
        Array1::from_vec(vec![
            self.area,
            self.bedrooms,
            self.bathrooms,
            self.age,
            self.loc0,
            self.loc1,
            self.loc2,
        ])
    }
}

/// One-hot embedding of a location; unknown labels map to zeros.
pub fn location_embedding(location: &Location) -> [f64; 3] {
    match location {
        Location::Downtown => [1.0, 0.0, 0.0],
        Location::Suburban => [0.0, 1.0, 0.0],
        Location::Rural => [0.0, 0.0, 1.0],
        Location::Other(_) => [0.0, 0.0, 0.0],
    }
}

pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Values outside the nominal ranges are passed through unclamped.
    pub fn encode(
        area: f64,
        bedrooms: f64,
        bathrooms: f64,
        age: f64,
        location: &Location,
    ) -> FeatureVector {
        let [loc0, loc1, loc2] = location_embedding(location);

        FeatureVector {
            area: area / AREA_SCALE,
            bedrooms: bedrooms / BEDROOMS_SCALE,
            bathrooms: bathrooms / BATHROOMS_SCALE,
            age: age / AGE_SCALE,
            loc0: loc0 * LOCATION_BOOST,
            loc1: loc1 * LOCATION_BOOST,
            loc2: loc2 * LOCATION_BOOST,
        }
    }

    pub fn encode_record(record: &PropertyRecord) -> FeatureVector {
        Self::encode(
            record.area,
            record.bedrooms as f64,
            record.bathrooms as f64,
            record.age,
            &record.location,
        )
    }

    /// Training matrix and normalized targets, rows in dataset order.
    pub fn encode_dataset(
        records: &[PropertyRecord],
        range: &PriceRange,
    ) -> (Array2<f64>, Array1<f64>) {
        let n_samples = records.len();
        let mut features = Array2::zeros((n_samples, N_FEATURES));
        let mut targets = Array1::zeros(n_samples);

        for (i, record) in records.iter().enumerate() {
            let encoded = Self::encode_record(record).to_array();
            features.row_mut(i).assign(&encoded);
            targets[i] = range.normalize(record.price);
        }

        (features, targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(area: f64, location: Location, price: f64) -> PropertyRecord {
        PropertyRecord {
            area,
            bedrooms: 3,
            bathrooms: 2,
            age: 10.0,
            location,
            price,
        }
    }

    #[test]
    fn scales_continuous_features() {
        let v = FeatureEngineer::encode(2500.0, 4.0, 3.0, 25.0, &Location::Rural);
        assert_eq!(v.area, 0.5);
        assert_eq!(v.bedrooms, 0.8);
        assert_eq!(v.bathrooms, 1.0);
        assert_eq!(v.age, 0.5);
    }

    #[test]
    fn no_clamping_outside_nominal_range() {
        let v = FeatureEngineer::encode(10000.0, 8.0, 0.0, 120.0, &Location::Downtown);
        assert_eq!(v.area, 2.0);
        assert!(v.bedrooms > 1.0);
        assert!(v.age > 1.0);
    }

    #[test]
    fn encoding_is_deterministic() {
        let a = FeatureEngineer::encode(1234.5, 2.0, 1.0, 7.5, &Location::Suburban);
        let b = FeatureEngineer::encode(1234.5, 2.0, 1.0, 7.5, &Location::Suburban);
        assert_eq!(a, b);
    }

    #[test]
    fn known_locations_are_boosted_one_hot() {
        for (location, hot) in [
            (Location::Downtown, 0),
            (Location::Suburban, 1),
            (Location::Rural, 2),
        ] {
            let v = FeatureEngineer::encode(1000.0, 1.0, 1.0, 1.0, &location);
            let locs = [v.loc0, v.loc1, v.loc2];
            for (i, value) in locs.iter().enumerate() {
                let expected = if i == hot { LOCATION_BOOST } else { 0.0 };
                assert_eq!(*value, expected, "{:?} component {}", location, i);
            }
        }
    }

    #[test]
    fn unknown_location_is_zero_vector() {
        let v = FeatureEngineer::encode(1000.0, 1.0, 1.0, 1.0, &Location::from("Moon"));
        assert_eq!([v.loc0, v.loc1, v.loc2], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn dataset_matrix_follows_record_order() {
        let records = vec![
            record(2000.0, Location::Downtown, 300.0),
            record(3000.0, Location::Suburban, 450.0),
        ];
        let range = PriceRange::fit(&records).unwrap();
        let (x, y) = FeatureEngineer::encode_dataset(&records, &range);

        assert_eq!(x.dim(), (2, N_FEATURES));
        assert_eq!(x[[0, 0]], 0.4);
        assert_eq!(x[[1, 5]], LOCATION_BOOST);
        assert_eq!(y.to_vec(), vec![0.0, 1.0]);
    }
}
