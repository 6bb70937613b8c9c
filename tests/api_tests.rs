//! Integration tests for the HTTP API.
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`; the
//! caller address is injected with `MockConnectInfo`.

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use health_assessment_api::config::Config;
use health_assessment_api::create_router;
use health_assessment_api::handlers::{AppState, ModelStatus};
use health_assessment_api::predictor::{FeatureRow, Predictor, PredictorAdapter};
use health_assessment_api::storage::{StorageKeyMode, SubmissionStore};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

struct FixedPredictor(&'static str);

impl Predictor for FixedPredictor {
    fn predict(&self, rows: &[FeatureRow]) -> anyhow::Result<Vec<String>> {
        Ok(rows.iter().map(|_| self.0.to_string()).collect())
    }
}

struct BrokenPredictor;

impl Predictor for BrokenPredictor {
    fn predict(&self, _rows: &[FeatureRow]) -> anyhow::Result<Vec<String>> {
        anyhow::bail!("feature names unseen at fit time: favourite_colour")
    }
}

fn test_config(tmp: &TempDir, rate_limit_per_hour: u64) -> Config {
    Config {
        port: 0,
        data_dir: tmp.path().join("data"),
        model_path: tmp.path().join("model.json"),
        public_dir: tmp.path().join("public"),
        rate_limit_per_hour,
        storage_key_mode: StorageKeyMode::Unique,
        stats_skip_malformed: false,
    }
}

async fn test_app(tmp: &TempDir, predictor: PredictorAdapter, rate_limit_per_hour: u64) -> Router {
    let config = test_config(tmp, rate_limit_per_hour);
    let store = SubmissionStore::open(&config.data_dir, config.storage_key_mode)
        .await
        .unwrap();
    let model = predictor.is_available().then(|| ModelStatus {
        name: "stub".to_string(),
        fingerprint: "00".to_string(),
    });
    let state = Arc::new(AppState {
        config,
        predictor,
        store,
        model,
    });
    create_router(state)
        .unwrap()
        .layer(MockConnectInfo(SocketAddr::from(([198, 51, 100, 4], 4242))))
}

fn post_json(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/health-assessment")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn valid_submission() -> Value {
    json!({
        "age": "40",
        "gender": "Male",
        "height": "180",
        "weight": "81",
        "education_level": "Bachelor",
        "smoking_status": "Never",
        "insurance": "Yes",
        "gene_marker_flag": "0"
    })
}

// =============================================================================
// SUBMISSION TESTS
// =============================================================================

#[tokio::test]
async fn test_submit_success() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(
        &tmp,
        PredictorAdapter::new(Arc::new(FixedPredictor("Moderate"))),
        0,
    )
    .await;

    let response = app.oneshot(post_json(&valid_submission())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Health assessment submitted successfully!");
    assert_eq!(body["data"]["risk_level"], "Moderate");
    assert_eq!(body["data"]["lifestyle_prediction"], "Moderate");
    assert_eq!(body["data"]["bmi"], json!(25.0));
    assert_eq!(
        body["data"]["recommendations"],
        json!(["Consider lifestyle modifications for weight management"])
    );

    let filename = body["data"]["filename"].as_str().unwrap();
    assert!(filename.contains("health_assessment_"));
    let stored: Value = serde_json::from_slice(&std::fs::read(filename).unwrap()).unwrap();
    assert_eq!(stored["ip_address"], "198.51.100.4");
    assert_eq!(stored["health_report"]["overall_risk_level"], "Moderate");
    assert_eq!(stored["bmi_scaled"], json!(75.0));
    assert_eq!(stored["bmi_corrected"], json!(24.88));
}

#[tokio::test]
async fn test_submit_validation_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp, PredictorAdapter::new(Arc::new(FixedPredictor("Low"))), 0).await;

    let response = app
        .oneshot(post_json(&json!({
            "gender": "Robot",
            "height": "tall",
            "weight": "70",
            "education_level": "High School"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Validation failed");
    let errors = body["errors"].as_array().unwrap();
    assert!(errors.contains(&json!({"field": "age", "message": "Age is required"})));
    assert!(errors.contains(&json!({"field": "gender", "message": "Invalid gender value"})));
    assert!(errors.contains(&json!({"field": "height", "message": "Height must be a valid number"})));

    let files = std::fs::read_dir(tmp.path().join("data")).unwrap().count();
    assert_eq!(files, 0);
}

#[tokio::test]
async fn test_submit_without_model() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp, PredictorAdapter::unavailable(), 0).await;

    let response = app.oneshot(post_json(&valid_submission())).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Prediction failed: Model not loaded");
}

#[tokio::test]
async fn test_submit_prediction_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp, PredictorAdapter::new(Arc::new(BrokenPredictor)), 0).await;

    let response = app.oneshot(post_json(&valid_submission())).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Prediction failed: "));
    assert!(message.contains("favourite_colour"));

    let files = std::fs::read_dir(tmp.path().join("data")).unwrap().count();
    assert_eq!(files, 0);
}

#[tokio::test]
async fn test_submit_storage_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp, PredictorAdapter::new(Arc::new(FixedPredictor("Low"))), 0).await;
    let data_dir = tmp.path().join("data");
    std::fs::remove_dir(&data_dir).unwrap();
    std::fs::write(&data_dir, "").unwrap();

    let response = app.oneshot(post_json(&valid_submission())).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({"success": false, "message": "Failed to save health assessment"})
    );
    assert!(data_dir.is_file());
}

#[tokio::test]
async fn test_submit_malformed_json_is_structured_400() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp, PredictorAdapter::new(Arc::new(FixedPredictor("Low"))), 0).await;

    let broken = Request::builder()
        .method("POST")
        .uri("/api/health-assessment")
        .header("content-type", "application/json")
        .body(Body::from("{\"age\": 40,"))
        .unwrap();
    let response = app.clone().oneshot(broken).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());

    let untyped = Request::builder()
        .method("POST")
        .uri("/api/health-assessment")
        .body(Body::from(valid_submission().to_string()))
        .unwrap();
    let response = app.oneshot(untyped).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_submit_non_object_body() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp, PredictorAdapter::new(Arc::new(FixedPredictor("Low"))), 0).await;

    let response = app.oneshot(post_json(&json!([1, 2, 3]))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submission_rate_limited_per_ip() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp, PredictorAdapter::new(Arc::new(FixedPredictor("Low"))), 1).await;

    let request = || {
        let mut req = post_json(&valid_submission());
        req.headers_mut()
            .insert("x-real-ip", "192.0.2.10".parse().unwrap());
        req
    };

    let first = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    // Reads are never limited
    let stats = app.oneshot(get("/api/stats")).await.unwrap();
    assert_eq!(stats.status(), StatusCode::OK);
}

// =============================================================================
// STATS TESTS
// =============================================================================

#[tokio::test]
async fn test_stats_empty_store() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp, PredictorAdapter::unavailable(), 0).await;

    let response = app.oneshot(get("/api/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["stats"]["total_assessments"], 0);
    assert_eq!(body["stats"]["average_age"], json!(0.0));
    assert_eq!(
        body["stats"]["risk_distribution"],
        json!({"Low": 0, "Moderate": 0, "High": 0})
    );
    assert_eq!(
        body["stats"]["gender_distribution"],
        json!({"Male": 0, "Female": 0, "Other": 0})
    );
    assert!(body["stats"]["last_updated"].is_string());
}

#[tokio::test]
async fn test_stats_after_submissions() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp, PredictorAdapter::new(Arc::new(FixedPredictor("High"))), 0).await;

    for (age, gender) in [("30", "Female"), ("41", "Female")] {
        let mut submission = valid_submission();
        submission["age"] = json!(age);
        submission["gender"] = json!(gender);
        let response = app.clone().oneshot(post_json(&submission)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let body = body_json(app.oneshot(get("/api/stats")).await.unwrap()).await;
    assert_eq!(body["stats"]["total_assessments"], 2);
    assert_eq!(body["stats"]["average_age"], json!(35.5));
    assert_eq!(body["stats"]["risk_distribution"]["High"], 2);
    assert_eq!(body["stats"]["gender_distribution"]["Female"], 2);
}

#[tokio::test]
async fn test_stats_malformed_file_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp, PredictorAdapter::unavailable(), 0).await;
    std::fs::write(
        tmp.path().join("data").join("health_assessment_1.json"),
        "{\"age\": ",
    )
    .unwrap();

    let response = app.oneshot(get("/api/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
}

// =============================================================================
// MISC ROUTES
// =============================================================================

#[tokio::test]
async fn test_health_reports_model_status() {
    let tmp = tempfile::tempdir().unwrap();

    let without = test_app(&tmp, PredictorAdapter::unavailable(), 0).await;
    let body = body_json(without.oneshot(get("/health")).await.unwrap()).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"]["loaded"], false);

    let with = test_app(&tmp, PredictorAdapter::new(Arc::new(FixedPredictor("Low"))), 0).await;
    let body = body_json(with.oneshot(get("/health")).await.unwrap()).await;
    assert_eq!(body["model"]["loaded"], true);
    assert_eq!(body["model"]["name"], "stub");
}

#[tokio::test]
async fn test_home_serves_html() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_app(&tmp, PredictorAdapter::unavailable(), 0).await;

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/html"));
}

#[tokio::test]
async fn test_public_assets_served() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("public")).unwrap();
    std::fs::write(tmp.path().join("public").join("app.css"), "body {}").unwrap();
    let app = test_app(&tmp, PredictorAdapter::unavailable(), 0).await;

    let response = app.clone().oneshot(get("/public/app.css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"body {}");

    let missing = app.oneshot(get("/public/nope.js")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}
