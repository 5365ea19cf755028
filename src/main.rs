//! API server for the price estimator

use std::sync::Arc;

use anyhow::Context;

use estate_ml::{
    api::{self, AppState},
    AppConfig, Dataset, FileStore, Perceptron, PredictionSession, Trainer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(?config, "Configuration loaded");

    let dataset = Dataset::load_or_bundled(config.dataset_path.as_deref())
        .context("Failed to load dataset")?;

    let store = Arc::new(FileStore::new(&config.store_dir));
    let trainer = Trainer::new(Perceptron, config.training.clone(), store);

    // Bad hyperparameters or an unusable price range abort startup here.
    let range = trainer
        .prepare(&dataset)
        .context("Invalid training setup")?;
    tracing::info!(min = range.min, max = range.max, "Price range");

    let mut session = PredictionSession::new(dataset, trainer);
    if !config.retrain_on_startup {
        match session.trainer().load_cached() {
            Ok(Some(cached)) => {
                tracing::info!(trained_at = %cached.trained_at, "Using cached model");
                session.install(cached);
            }
            Ok(None) => tracing::info!("No cached model, training"),
            Err(e) => tracing::warn!("Cached model unusable, training: {}", e),
        }
    }

    let needs_training = !session.is_ready();
    let state = AppState::new(session);
    let app = api::router(state.clone());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("Server listening on http://{}", config.bind_addr);

    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    // Predictions answer "Model not loaded" until this finishes.
    if needs_training {
        let report = api::retrain(state)
            .await
            .context("Initial training failed")?;
        tracing::info!(
            iterations = report.iterations,
            error = report.error,
            converged = report.converged,
            "Model ready"
        );
    }

    server
        .await
        .context("Server task failed")?
        .context("Server error")?;
    Ok(())
}
