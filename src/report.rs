use crate::models::{EnrichedRecord, HealthReport, PENDING_RISK_LEVEL};
use chrono::Utc;

pub const UNDERWEIGHT_ADVICE: &str = "Consult a nutritionist for healthy weight gain";
pub const OVERWEIGHT_ADVICE: &str = "Consider lifestyle modifications for weight management";
pub const OBESE_ADVICE: &str = "Consult a healthcare provider for weight management";

/// Build the user-facing report for an enriched record.
///
/// The risk level is left as a placeholder; the caller assigns the predicted
/// label once the classifier has answered.
pub fn generate_report(record: &EnrichedRecord) -> HealthReport {
    HealthReport {
        overall_risk_level: PENDING_RISK_LEVEL.to_string(),
        recommendations: recommendations_for(record.bmi),
        generated_at: Utc::now(),
    }
}

/// Recommendations for a BMI value. The bands are disjoint, so at most one applies.
pub fn recommendations_for(bmi: Option<f64>) -> Vec<String> {
    let mut recommendations = Vec::new();
    // A zero BMI carries no information
    let Some(bmi) = bmi.filter(|b| *b != 0.0) else {
        return recommendations;
    };

    if bmi < 18.5 {
        recommendations.push(UNDERWEIGHT_ADVICE.to_string());
    } else if (25.0..30.0).contains(&bmi) {
        recommendations.push(OVERWEIGHT_ADVICE.to_string());
    } else if bmi >= 30.0 {
        recommendations.push(OBESE_ADVICE.to_string());
    }

    recommendations
}
