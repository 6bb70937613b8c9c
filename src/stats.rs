/// Aggregate statistics over the submission store
///
/// Every call rescans the store; nothing is cached.
use crate::errors::AppError;
use crate::models::{
    numeric_value, round2, Gender, GenderDistribution, RiskDistribution, RiskLevel, StatsSnapshot,
};
use crate::storage::SubmissionStore;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// What to do with a persisted file that cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Abort the whole computation with `MalformedRecord`.
    #[default]
    Abort,
    /// Log the file and leave it out of every count.
    Skip,
}

/// The subset of a persisted submission the aggregator reads.
#[derive(Debug, Deserialize)]
struct StatsView {
    #[serde(default)]
    age: Option<Value>,
    #[serde(default)]
    gender: Option<Value>,
    health_report: ReportView,
}

#[derive(Debug, Deserialize)]
struct ReportView {
    /// Absent means `Low`. Null or non-string labels match no bucket.
    #[serde(default = "default_risk_level")]
    overall_risk_level: Value,
}

fn default_risk_level() -> Value {
    Value::String("Low".to_string())
}

#[derive(Debug, Default)]
struct Accumulator {
    total: u64,
    age_sum: f64,
    risk: RiskDistribution,
    gender: GenderDistribution,
}

impl Accumulator {
    fn add(&mut self, view: &StatsView) {
        self.total += 1;
        // Missing or unparseable ages still count towards the total
        self.age_sum += view
            .age
            .as_ref()
            .and_then(numeric_value)
            .filter(|a| a.is_finite())
            .unwrap_or(0.0);

        if let Some(level) = view
            .health_report
            .overall_risk_level
            .as_str()
            .and_then(RiskLevel::from_label)
        {
            self.risk.record(level);
        }
        if let Some(gender) = view
            .gender
            .as_ref()
            .and_then(Value::as_str)
            .and_then(Gender::from_label)
        {
            self.gender.record(gender);
        }
    }

    fn finish(self) -> StatsSnapshot {
        let average_age = if self.total == 0 {
            0.0
        } else {
            round2(self.age_sum / self.total as f64)
        };

        StatsSnapshot {
            total_assessments: self.total,
            average_age,
            risk_distribution: self.risk,
            gender_distribution: self.gender,
            last_updated: Utc::now(),
        }
    }
}

/// Compute statistics over every persisted submission.
pub async fn compute_stats(
    store: &SubmissionStore,
    policy: MalformedPolicy,
) -> Result<StatsSnapshot, AppError> {
    let files = store.list().await?;
    let mut acc = Accumulator::default();

    for path in &files {
        match read_view(path).await {
            Ok(view) => acc.add(&view),
            Err(AppError::MalformedRecord { key, message }) if policy == MalformedPolicy::Skip => {
                tracing::warn!("Skipping malformed submission {}: {}", key, message);
            }
            Err(e) => return Err(e),
        }
    }

    tracing::debug!("Computed stats over {} submission(s)", acc.total);
    Ok(acc.finish())
}

async fn read_view(path: &Path) -> Result<StatsView, AppError> {
    let key = path.display().to_string();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::StorageUnavailable(format!("Failed to read {}: {}", key, e)))?;

    serde_json::from_slice(&bytes).map_err(|e| AppError::MalformedRecord {
        key,
        message: e.to_string(),
    })
}
