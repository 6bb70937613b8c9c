use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use health_assessment_api::config::Config;
use health_assessment_api::handlers::{AppState, ModelStatus};
use health_assessment_api::predictor::{load_model, PredictorAdapter};
use health_assessment_api::storage::SubmissionStore;

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - The classifier, loaded once from its artifact.
/// - The submission store.
/// - HTTP routes and middleware (CORS, Rate Limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "health_assessment_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // A missing or invalid model degrades the service to validation and
    // enrichment only; requests then fail at the prediction step.
    let (predictor, model) = match load_model(&config.model_path) {
        Ok(loaded) => {
            tracing::info!(
                "✓ Model '{}' loaded from {} (sha256 {})",
                loaded.name,
                config.model_path.display(),
                loaded.fingerprint
            );
            (
                PredictorAdapter::new(loaded.predictor),
                Some(ModelStatus {
                    name: loaded.name,
                    fingerprint: loaded.fingerprint,
                }),
            )
        }
        Err(e) => {
            tracing::error!("Error loading model: {:#}", e);
            (PredictorAdapter::unavailable(), None)
        }
    };

    let store = SubmissionStore::open(&config.data_dir, config.storage_key_mode).await?;
    tracing::info!("Submission store ready at {}", store.dir().display());

    let addr = format!("0.0.0.0:{}", config.port);

    // Build application state
    let app_state = Arc::new(AppState {
        config,
        predictor,
        store,
        model,
    });

    let app = health_assessment_api::create_router(app_state)?;

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
