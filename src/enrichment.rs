/// Submission enrichment
///
/// Derives body-mass index and its variants, normalizes the insurance and
/// gene-marker flags and stamps request metadata onto the record.
use crate::models::{
    is_blank, numeric_value, round2, EnrichedRecord, Insurance, Submission, DERIVED_FIELDS,
    REPORT_FIELD,
};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Factor applied to produce `bmi_corrected`.
const BMI_CORRECTION_FACTOR: f64 = 0.995;
/// Factor applied to produce `bmi_scaled`.
const BMI_SCALE_FACTOR: f64 = 3.0;

/// Body-mass index and the variants derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BmiMetrics {
    pub bmi: f64,
    pub corrected: f64,
    pub scaled: f64,
}

/// Enrich a validated submission, stamping it with the current time.
pub fn enrich(submission: &Submission, origin_address: &str) -> EnrichedRecord {
    enrich_at(submission, origin_address, Utc::now())
}

/// Enrich a submission with an explicit submission time.
pub fn enrich_at(
    submission: &Submission,
    origin_address: &str,
    now: DateTime<Utc>,
) -> EnrichedRecord {
    let mut fields = submission.fields().clone();
    for key in DERIVED_FIELDS.iter().chain(std::iter::once(&REPORT_FIELD)) {
        fields.remove(*key);
    }

    let metrics = match (submission.get("height"), submission.get("weight")) {
        (Some(height), Some(weight)) if !is_blank(height) && !is_blank(weight) => {
            let metrics = compute_bmi(height, weight);
            if metrics.is_none() {
                tracing::warn!(
                    "Could not derive BMI from height={} weight={}",
                    height,
                    weight
                );
            }
            metrics
        }
        _ => None,
    };

    EnrichedRecord {
        fields,
        bmi: metrics.map(|m| m.bmi),
        bmi_estimated: metrics.map(|m| m.bmi),
        bmi_corrected: metrics.map(|m| m.corrected),
        bmi_scaled: metrics.map(|m| m.scaled),
        insurance: normalize_insurance(submission.get("insurance")),
        gene_marker_flag: coerce_flag(submission.get("gene_marker_flag")),
        submission_timestamp: now,
        ip_address: origin_address.to_string(),
    }
}

/// Compute BMI from height in centimeters and weight in kilograms.
///
/// Returns `None` when either value is not numeric, height is not positive,
/// or the result is not a finite number.
pub fn compute_bmi(height_cm: &Value, weight_kg: &Value) -> Option<BmiMetrics> {
    let height_m = numeric_value(height_cm)? / 100.0;
    let weight = numeric_value(weight_kg)?;
    if !(height_m > 0.0) {
        return None;
    }

    let raw = weight / height_m.powi(2);
    if !raw.is_finite() {
        return None;
    }

    Some(BmiMetrics {
        bmi: round2(raw),
        corrected: round2(raw * BMI_CORRECTION_FACTOR),
        scaled: round2(raw * BMI_SCALE_FACTOR),
    })
}

/// Only the exact string `"Yes"` counts as insured.
fn normalize_insurance(value: Option<&Value>) -> Insurance {
    match value {
        Some(Value::String(s)) if s == "Yes" => Insurance::Yes,
        _ => Insurance::No,
    }
}

/// Coerce the gene-marker flag to an integer, defaulting to 0.
fn coerce_flag(value: Option<&Value>) -> i64 {
    let Some(value) = value else {
        return 0;
    };
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::Bool(b) => i64::from(*b),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}
