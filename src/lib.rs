//! Health Assessment API Library
//!
//! This library provides the core functionality for the Health Assessment API:
//! questionnaire validation, BMI enrichment, report generation, risk
//! prediction through a pre-trained model, file-backed persistence and
//! aggregate statistics.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `data`: Data access layer.
//! - `assessment`: Submission workflow (validate → enrich → predict → store).
//! - `config`: Configuration management.
//! - `enrichment`: BMI and metadata enrichment.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `models`: Questionnaire, record, report and statistics models.
//! - `predictor`: Classifier trait, artifact loader and adapter.
//! - `report`: Recommendation report generation.
//! - `stats`: Aggregate statistics.
//! - `storage`: One-file-per-submission store.
//! - `validation`: Questionnaire validation.

pub mod api;
pub mod core;
pub mod data;

pub mod assessment;
pub mod config;
pub mod enrichment;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod predictor;
pub mod report;
pub mod stats;
pub mod storage;
pub mod validation;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::CorsLayer, limit::RequestBodyLimitLayer, services::ServeDir, trace::TraceLayer,
};

use crate::handlers::AppState;

/// Request size limit: 5MB max payload.
pub const MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Milliseconds between two replenished slots for an hourly quota.
fn replenish_interval_ms(per_hour: u64) -> u64 {
    3_600_000 / per_hour.max(1)
}

/// Build the application router.
///
/// The submission route is rate limited per client IP when
/// `rate_limit_per_hour` is non-zero. The server must be run with
/// `into_make_service_with_connect_info::<SocketAddr>()` so handlers and the
/// rate limiter can see the caller's address.
pub fn create_router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let mut submissions = Router::new().route(
        "/api/health-assessment",
        post(handlers::submit_assessment),
    );

    let per_hour = state.config.rate_limit_per_hour;
    if per_hour > 0 {
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_millisecond(replenish_interval_ms(per_hour))
                .burst_size(per_hour as u32)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?,
        );
        submissions = submissions.layer(ServiceBuilder::new().layer(GovernorLayer {
            config: governor_conf,
        }));
        tracing::info!("Submissions limited to {} per hour per IP", per_hour);
    }

    let public_dir = state.config.public_dir.clone();

    let app = Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/api/stats", get(handlers::get_stats))
        .merge(submissions)
        .nest_service("/public", ServeDir::new(public_dir))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replenish_interval_keeps_hourly_quota() {
        assert_eq!(replenish_interval_ms(3), 1_200_000);
        assert_eq!(replenish_interval_ms(2000), 1_800);
        assert_eq!(replenish_interval_ms(3600), 1_000);
        for per_hour in [1, 7, 1801, 2400, 3600] {
            let slots = 3_600_000 / replenish_interval_ms(per_hour);
            assert!(slots >= per_hour && slots < per_hour + per_hour / 100 + 1);
        }
    }
}
