//! Browser bindings: the prediction form calls into this session directly and
//! the trained model is cached in `localStorage`.

use std::sync::Arc;

use wasm_bindgen::prelude::*;

use crate::config::TrainingConfig;
use crate::dataset::Dataset;
use crate::error::{EstateError, EstateResult};
use crate::models::network::Perceptron;
use crate::models::trainer::Trainer;
use crate::session::PredictionSession;
use crate::store::ModelStore;
use crate::types::RawQuery;

/// `window.localStorage`, looked up on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorageStore;

impl LocalStorageStore {
    fn storage(&self) -> EstateResult<web_sys::Storage> {
        web_sys::window()
            .ok_or_else(|| EstateError::Store("no window".to_string()))?
            .local_storage()
            .map_err(js_store_error)?
            .ok_or_else(|| EstateError::Store("localStorage unavailable".to_string()))
    }
}

fn js_store_error(value: JsValue) -> EstateError {
    EstateError::Store(format!("{:?}", value))
}

impl ModelStore for LocalStorageStore {
    fn get(&self, key: &str) -> EstateResult<Option<String>> {
        self.storage()?.get_item(key).map_err(js_store_error)
    }

    fn set(&self, key: &str, value: &str) -> EstateResult<()> {
        self.storage()?.set_item(key, value).map_err(js_store_error)
    }

    fn remove(&self, key: &str) -> EstateResult<()> {
        self.storage()?.remove_item(key).map_err(js_store_error)
    }
}

fn to_js(e: EstateError) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}

#[wasm_bindgen]
pub struct PricePredictor {
    session: PredictionSession,
}

#[wasm_bindgen]
impl PricePredictor {
    /// Trains on the bundled dataset, or reuses the cached model when
    /// `reuse_cached` is set.
    #[wasm_bindgen(constructor)]
    pub fn new(reuse_cached: bool) -> Result<PricePredictor, JsValue> {
        let dataset = Dataset::bundled().map_err(to_js)?;
        let trainer = Trainer::new(
            Perceptron,
            TrainingConfig::default(),
            Arc::new(LocalStorageStore),
        );
        let mut session = PredictionSession::new(dataset, trainer);

        if reuse_cached {
            session.restore_or_train().map_err(to_js)?;
        } else {
            session.train().map_err(to_js)?;
        }

        Ok(PricePredictor { session })
    }

    /// Returns the formatted price and appends a chart point. Errors carry
    /// the message to show in place of the price.
    pub fn predict(
        &mut self,
        area: &str,
        bedrooms: &str,
        bathrooms: &str,
        age: &str,
        location: &str,
    ) -> Result<String, JsValue> {
        let query = RawQuery::new(area, bedrooms, bathrooms, age, location);
        let record = self.session.submit(&query).map_err(to_js)?;
        Ok(format!("{:.2}", record.predicted_price))
    }

    /// Chart series as JSON: `{actual_prices, predicted_prices, labels}`.
    pub fn chart(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.chart()).map_err(|e| to_js(e.into()))
    }
}
