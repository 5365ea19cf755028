//! HTTP API over a shared prediction session

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::{EstateError, EstateResult};
use crate::preprocessing::PriceRange;
use crate::session::PredictionSession;
use crate::types::{ChartSeries, RawQuery, TrainingReport};

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<PredictionSession>>,
    /// Held for the whole of a retrain; at most one runs at a time.
    pub training: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(session: PredictionSession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            training: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Two-decimal display value.
    pub predicted_price: String,
    pub price: f64,
    pub actual_price: Option<f64>,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub topology: Vec<usize>,
    pub price_range: PriceRange,
    pub report: TrainingReport,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Maps crate errors onto HTTP responses; the body carries the user-facing
/// message.
pub struct ApiError(pub EstateError);

impl From<EstateError> for ApiError {
    fn from(e: EstateError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            EstateError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            EstateError::InvalidPrediction => StatusCode::UNPROCESSABLE_ENTITY,
            EstateError::ModelNotReady => StatusCode::SERVICE_UNAVAILABLE,
            EstateError::TrainingInProgress => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if self.0.is_recoverable() {
            tracing::warn!("Request failed: {:?}", self.0);
        } else {
            tracing::error!("Request failed: {}", self.0);
        }

        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/predict", post(predict))
        .route("/api/chart", get(chart))
        .route("/api/model", get(model_status))
        .route("/api/train", post(train))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Trains on the blocking pool and installs the result. The session lock is
/// not held while training, so requests keep being answered. Fails with
/// `TrainingInProgress` if another retrain has not finished yet.
pub async fn retrain(state: AppState) -> EstateResult<TrainingReport> {
    let _running = state
        .training
        .try_lock()
        .map_err(|_| EstateError::TrainingInProgress)?;

    let (trainer, dataset) = {
        let session = state.session.lock().await;
        (session.trainer().clone(), session.dataset().clone())
    };

    let trained = tokio::task::spawn_blocking(move || trainer.train(&dataset))
        .await
        .map_err(|e| EstateError::Configuration(format!("Training task failed: {}", e)))??;

    let report = trained.report.clone();
    state.session.lock().await.install(trained);
    Ok(report)
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Real Estate Price Prediction API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let ready = state.session.lock().await.is_ready();
    Json(serde_json::json!({ "status": "ok", "model_ready": ready }))
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<RawQuery>, JsonRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let Json(query) = payload.map_err(|rejection| {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        EstateError::InvalidInput { field: "body" }
    })?;
    let mut session = state.session.lock().await;
    let record = session.submit(&query)?;

    Ok(Json(PredictResponse {
        predicted_price: format!("{:.2}", record.predicted_price),
        price: record.predicted_price,
        actual_price: record.actual_price,
        label: record.label,
    }))
}

async fn chart(State(state): State<AppState>) -> Json<ChartSeries> {
    Json(state.session.lock().await.chart())
}

async fn model_status(State(state): State<AppState>) -> Result<Json<ModelStatus>, ApiError> {
    let session = state.session.lock().await;
    let model = session.model().ok_or(EstateError::ModelNotReady)?;

    Ok(Json(ModelStatus {
        topology: model.network.sizes.clone(),
        price_range: model.price_range,
        report: model.report.clone(),
        trained_at: model.trained_at,
    }))
}

async fn train(State(state): State<AppState>) -> Result<Json<ModelStatus>, ApiError> {
    tracing::info!("Retraining requested");
    retrain(state.clone()).await?;
    model_status(State(state)).await
}
