//! Risk prediction.
//!
//! The classifier is an opaque capability behind the [`Predictor`] trait. In
//! production it is a [`LinearModel`] loaded once from a JSON artifact; tests
//! plug in stubs. [`PredictorAdapter`] owns the optional handle and turns an
//! enriched record into a single risk label.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use crate::errors::AppError;
use crate::models::{is_known_record_field, numeric_value, EnrichedRecord};

/// One structured input row: field name to value.
pub type FeatureRow = Map<String, Value>;

/// A classifier that maps rows to labels, one label per row.
pub trait Predictor: Send + Sync {
    fn predict(&self, rows: &[FeatureRow]) -> anyhow::Result<Vec<String>>;
}

/// Wraps the process-wide classifier handle.
///
/// Constructed once at startup and shared read-only between requests.
#[derive(Clone, Default)]
pub struct PredictorAdapter {
    predictor: Option<Arc<dyn Predictor>>,
}

impl PredictorAdapter {
    pub fn new(predictor: Arc<dyn Predictor>) -> Self {
        Self {
            predictor: Some(predictor),
        }
    }

    /// An adapter with no classifier. Every prediction fails with `ModelUnavailable`.
    pub fn unavailable() -> Self {
        Self { predictor: None }
    }

    pub fn is_available(&self) -> bool {
        self.predictor.is_some()
    }

    /// Predict the risk label for one enriched record.
    ///
    /// Classifier errors and panics are reported as `PredictionFailed` with
    /// the original message and are never retried.
    pub fn predict(&self, record: &EnrichedRecord) -> Result<String, AppError> {
        let predictor = self.predictor.as_ref().ok_or(AppError::ModelUnavailable)?;

        let row = record
            .to_row()
            .map_err(|e| AppError::PredictionFailed(format!("Failed to build input row: {}", e)))?;
        tracing::debug!("Prediction input columns: {:?}", row.keys().collect::<Vec<_>>());

        // A panicking classifier fails this request only
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            predictor.predict(std::slice::from_ref(&row))
        }))
        .map_err(|payload| AppError::PredictionFailed(panic_message(payload.as_ref())))?;
        let labels = outcome.map_err(|e| AppError::PredictionFailed(e.to_string()))?;

        labels
            .into_iter()
            .next()
            .ok_or_else(|| AppError::PredictionFailed("Model returned no prediction".to_string()))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "classifier panicked".to_string()
    }
}

// ============ Linear model artifact ============

/// One input feature of a [`LinearModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Enriched-record field the feature is read from.
    pub name: String,
    /// When set, the feature is a 0/1 indicator of `row[name] == category`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub mean: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl FeatureSpec {
    fn encode(&self, row: &FeatureRow) -> anyhow::Result<f64> {
        let value = row.get(&self.name).filter(|v| !v.is_null());

        if let Some(category) = &self.category {
            let hit = value.and_then(Value::as_str) == Some(category.as_str());
            return Ok(if hit { 1.0 } else { 0.0 });
        }

        let x = value.and_then(numeric_value).ok_or_else(|| {
            anyhow::anyhow!("feature '{}' is missing or not numeric", self.name)
        })?;
        Ok((x - self.mean) / self.scale)
    }
}

/// A multi-class linear classifier: one weight row and intercept per class,
/// prediction is the class with the highest score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub model_name: String,
    /// Class labels. Non-string labels are rendered with their JSON text.
    pub classes: Vec<Value>,
    pub features: Vec<FeatureSpec>,
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl LinearModel {
    /// Parse and check an artifact.
    pub fn from_json(bytes: &[u8]) -> anyhow::Result<Self> {
        let model: LinearModel =
            serde_json::from_slice(bytes).context("Model artifact is not valid JSON")?;
        model.check_schema()?;
        Ok(model)
    }

    /// Verify weight shapes and that every feature is a known record field.
    pub fn check_schema(&self) -> anyhow::Result<()> {
        if self.classes.is_empty() {
            anyhow::bail!("Model declares no classes");
        }
        if self.coefficients.len() != self.classes.len() {
            anyhow::bail!(
                "Model has {} coefficient rows for {} classes",
                self.coefficients.len(),
                self.classes.len()
            );
        }
        if self.intercepts.len() != self.classes.len() {
            anyhow::bail!(
                "Model has {} intercepts for {} classes",
                self.intercepts.len(),
                self.classes.len()
            );
        }
        for (i, row) in self.coefficients.iter().enumerate() {
            if row.len() != self.features.len() {
                anyhow::bail!(
                    "Coefficient row {} has {} weights, expected {}",
                    i,
                    row.len(),
                    self.features.len()
                );
            }
        }

        let unknown: Vec<&str> = self
            .features
            .iter()
            .map(|f| f.name.as_str())
            .filter(|name| !is_known_record_field(name))
            .collect();
        if !unknown.is_empty() {
            anyhow::bail!("Model expects unknown features: {}", unknown.join(", "));
        }

        for feature in &self.features {
            if !feature.scale.is_finite() || feature.scale == 0.0 || !feature.mean.is_finite() {
                anyhow::bail!("Feature '{}' has an invalid mean or scale", feature.name);
            }
        }

        Ok(())
    }

    fn predict_row(&self, row: &FeatureRow) -> anyhow::Result<String> {
        let inputs = self
            .features
            .iter()
            .map(|f| f.encode(row))
            .collect::<anyhow::Result<Vec<f64>>>()?;

        let mut best: Option<(usize, f64)> = None;
        for (class, (weights, intercept)) in
            self.coefficients.iter().zip(&self.intercepts).enumerate()
        {
            let score = intercept + weights.iter().zip(&inputs).map(|(w, x)| w * x).sum::<f64>();
            if !score.is_finite() {
                anyhow::bail!("Score for class {} is not finite", class);
            }
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((class, score));
            }
        }

        let (class, _) = best.ok_or_else(|| anyhow::anyhow!("Model has no classes"))?;
        Ok(label_text(&self.classes[class]))
    }
}

impl Predictor for LinearModel {
    fn predict(&self, rows: &[FeatureRow]) -> anyhow::Result<Vec<String>> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }
}

fn label_text(label: &Value) -> String {
    match label {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============ Loading ============

/// A classifier loaded from disk, with facts reported by `/health`.
#[derive(Clone)]
pub struct LoadedModel {
    pub name: String,
    /// SHA-256 of the artifact bytes (hex encoded).
    pub fingerprint: String,
    pub predictor: Arc<dyn Predictor>,
}

/// Load a model artifact. Called once at process start.
pub fn load_model(path: &Path) -> anyhow::Result<LoadedModel> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read model artifact {}", path.display()))?;
    let model = LinearModel::from_json(&bytes)
        .with_context(|| format!("Invalid model artifact {}", path.display()))?;

    Ok(LoadedModel {
        name: model.model_name.clone(),
        fingerprint: fingerprint(&bytes),
        predictor: Arc::new(model),
    })
}

/// SHA-256 checksum of an artifact, hex encoded.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
