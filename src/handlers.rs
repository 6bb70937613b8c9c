use crate::assessment::AssessmentService;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{AssessmentData, AssessmentResponse, StatsResponse, Submission};
use crate::predictor::PredictorAdapter;
use crate::stats::compute_stats;
use crate::storage::SubmissionStore;
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;

/// Facts about the loaded classifier, reported by `/health`.
#[derive(Debug, Clone)]
pub struct ModelStatus {
    pub name: String,
    pub fingerprint: String,
}

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Classifier handle created once at startup.
    pub predictor: PredictorAdapter,
    /// Submission files on disk.
    pub store: SubmissionStore,
    /// Loaded model details, `None` when running without a model.
    pub model: Option<ModelStatus>,
}

/// Health check endpoint.
///
/// Reports the service version and whether a model is loaded. The service
/// stays healthy without a model; submissions then fail at prediction time.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let model = match &state.model {
        Some(model) => json!({
            "loaded": true,
            "name": model.name,
            "fingerprint": model.fingerprint,
        }),
        None => json!({ "loaded": false }),
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "health-assessment-api",
            "version": env!("CARGO_PKG_VERSION"),
            "model": model,
        })),
    )
}

/// GET /
///
/// Landing page for the questionnaire.
pub async fn home() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Health Assessment</title>
</head>
<body>
    <h1>Health Assessment</h1>
    <p>Complete your comprehensive health assessment</p>
</body>
</html>
"#,
    )
}

/// POST /api/health-assessment
///
/// Validates, enriches, scores and stores one questionnaire.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `addr` - Network address of the caller, stamped onto the record.
/// * `body` - The questionnaire as a JSON object. Unparseable bodies are
///   answered with a JSON 400 like any other bad request.
///
/// # Returns
///
/// * `Result<Json<AssessmentResponse>, AppError>` - The assessment result, or a
///   400 for validation failures and a 500 for prediction or storage failures.
pub async fn submit_assessment(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AssessmentResponse>, AppError> {
    let Json(body) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let Value::Object(fields) = body else {
        return Err(AppError::BadRequest(
            "Request body must be a JSON object".to_string(),
        ));
    };
    let origin = addr.ip().to_string();
    tracing::info!("POST /api/health-assessment from {}", origin);

    let service = AssessmentService::new(&state.predictor, &state.store);
    let outcome = service.process(&Submission::new(fields), &origin).await?;

    Ok(Json(AssessmentResponse {
        success: true,
        message: "Health assessment submitted successfully!".to_string(),
        data: AssessmentData {
            risk_level: outcome.report.overall_risk_level,
            bmi: outcome.record.bmi,
            recommendations: outcome.report.recommendations,
            lifestyle_prediction: outcome.prediction,
            filename: outcome.storage_key,
            timestamp: outcome.record.submission_timestamp,
        },
    }))
}

/// GET /api/stats
///
/// Recomputes aggregate statistics from every stored submission.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, AppError> {
    let stats = compute_stats(&state.store, state.config.malformed_policy()).await?;

    tracing::info!(
        "GET /api/stats - {} assessment(s)",
        stats.total_assessments
    );

    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}
