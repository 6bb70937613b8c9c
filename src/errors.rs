use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::models::FieldError;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// The submission failed validation. Carries every field-level problem found.
    Validation(Vec<FieldError>),
    /// No classifier was loaded at startup.
    ModelUnavailable,
    /// The classifier rejected or failed on the input row.
    PredictionFailed(String),
    /// A submission could not be written to the store.
    StorageWriteFailed(String),
    /// The storage directory could not be listed or read.
    StorageUnavailable(String),
    /// A persisted submission could not be parsed.
    MalformedRecord {
        /// Storage key of the offending file.
        key: String,
        /// Parser message.
        message: String,
    },
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(errors) => {
                write!(f, "Validation failed: {} field error(s)", errors.len())
            }
            AppError::ModelUnavailable => write!(f, "Model not loaded"),
            AppError::PredictionFailed(msg) => write!(f, "Prediction failed: {}", msg),
            AppError::StorageWriteFailed(msg) => write!(f, "Storage write failed: {}", msg),
            AppError::StorageUnavailable(msg) => write!(f, "Storage unavailable: {}", msg),
            AppError::MalformedRecord { key, message } => {
                write!(f, "Malformed record {}: {}", key, message)
            }
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Returns the innermost error, skipping context wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// HTTP status the boundary maps this error to.
    pub fn status_code(&self) -> StatusCode {
        match self.root() {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    /// Converts the error into a structured `{success: false, ...}` response.
    ///
    /// Server-side failures are logged here so handlers can simply use `?`.
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            AppError::Validation(errors) => {
                tracing::info!("Rejected submission with {} field error(s)", errors.len());
                json!({
                    "success": false,
                    "message": "Validation failed",
                    "errors": errors,
                })
            }
            AppError::ModelUnavailable => {
                tracing::error!("Prediction requested but no model is loaded");
                json!({
                    "success": false,
                    "message": "Prediction failed: Model not loaded",
                })
            }
            AppError::PredictionFailed(msg) => {
                tracing::error!("Prediction error: {}", msg);
                json!({
                    "success": false,
                    "message": format!("Prediction failed: {}", msg),
                })
            }
            AppError::StorageWriteFailed(msg) => {
                tracing::error!("Storage write error: {}", msg);
                json!({
                    "success": false,
                    "message": "Failed to save health assessment",
                })
            }
            AppError::StorageUnavailable(msg) => {
                tracing::error!("Storage unavailable: {}", msg);
                json!({
                    "success": false,
                    "message": msg,
                })
            }
            AppError::MalformedRecord { key, message } => {
                tracing::error!("Malformed record {}: {}", key, message);
                json!({
                    "success": false,
                    "message": format!("Malformed record {}: {}", key, message),
                })
            }
            AppError::BadRequest(msg) => json!({
                "success": false,
                "message": msg,
            }),
            AppError::WithContext { source, context } => {
                // Log full context chain, then answer as the underlying error would
                tracing::error!("Error with context: {} -> {}", context, source);
                return (*source).into_response();
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
