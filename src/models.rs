use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============ Questionnaire Schema ============

/// Fields every submission must carry with a non-empty value.
pub const REQUIRED_FIELDS: [&str; 5] = ["age", "gender", "height", "weight", "education_level"];

/// Fields that must parse as numbers whenever they are filled in.
pub const NUMERIC_FIELDS: [&str; 23] = [
    "age",
    "height",
    "weight",
    "waist_size",
    "blood_pressure",
    "heart_rate",
    "cholesterol",
    "glucose",
    "insulin",
    "sleep_hours",
    "work_hours",
    "physical_activity",
    "daily_steps",
    "screen_time",
    "calorie_intake",
    "sugar_intake",
    "water_intake",
    "meals_per_day",
    "stress_level",
    "mental_health_score",
    "income",
    "environmental_risk_score",
    "electrolyte_level",
];

/// Keys written by enrichment. Raw values under these names are replaced.
pub const DERIVED_FIELDS: [&str; 8] = [
    "bmi",
    "bmi_estimated",
    "bmi_corrected",
    "bmi_scaled",
    "insurance",
    "gene_marker_flag",
    "submission_timestamp",
    "ip_address",
];

/// Key under which the report is embedded in a persisted submission.
pub const REPORT_FIELD: &str = "health_report";

/// Risk label carried by a report until the classifier has answered.
pub const PENDING_RISK_LEVEL: &str = "Pending model prediction";

/// Returns true if `name` is a field an enriched record can carry.
///
/// Model artifacts are checked against this list when they are loaded.
pub fn is_known_record_field(name: &str) -> bool {
    REQUIRED_FIELDS.contains(&name)
        || NUMERIC_FIELDS.contains(&name)
        || DERIVED_FIELDS.contains(&name)
}

/// Interprets a questionnaire value as a number.
///
/// Accepts JSON numbers, booleans (as 1/0) and strings holding a float
/// literal. Surrounding whitespace is ignored.
pub fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Returns true for values a form treats as "not filled in".
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Rounds to two decimal places, exact ties going to the even digit.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

// ============ Enumerations ============

/// Gender values accepted by the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Male" => Some(Self::Male),
            "Female" => Some(Self::Female),
            "Other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Risk buckets tracked by the statistics endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Low" => Some(Self::Low),
            "Moderate" => Some(Self::Moderate),
            "High" => Some(Self::High),
            _ => None,
        }
    }
}

/// Normalized insurance flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Insurance {
    Yes,
    No,
}

// ============ Submission Models ============

/// One raw questionnaire, exactly as the client sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Submission(pub Map<String, Value>);

impl Submission {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Looks up a field, treating explicit `null` the same as absence.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Submission {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// A single field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field.
    pub field: String,
    /// Human-readable message shown next to the field.
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A submission with derived metrics and request metadata attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    /// Raw questionnaire fields carried forward unchanged.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// Body-mass index, absent when height or weight could not be used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi_estimated: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi_corrected: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi_scaled: Option<f64>,
    pub insurance: Insurance,
    pub gene_marker_flag: i64,
    pub submission_timestamp: DateTime<Utc>,
    pub ip_address: String,
}

impl EnrichedRecord {
    /// Presents the record as one structured row keyed by field name.
    pub fn to_row(&self) -> Result<Map<String, Value>, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(row) => Ok(row),
            _ => Ok(Map::new()),
        }
    }
}

/// Report shown to the user after a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall_risk_level: String,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// What ends up on disk: the enriched record with its report embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSubmission {
    #[serde(flatten)]
    pub record: EnrichedRecord,
    pub health_report: HealthReport,
}

// ============ Statistics Models ============

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    #[serde(rename = "Low")]
    pub low: u64,
    #[serde(rename = "Moderate")]
    pub moderate: u64,
    #[serde(rename = "High")]
    pub high: u64,
}

impl RiskDistribution {
    pub fn record(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Moderate => self.moderate += 1,
            RiskLevel::High => self.high += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderDistribution {
    #[serde(rename = "Male")]
    pub male: u64,
    #[serde(rename = "Female")]
    pub female: u64,
    #[serde(rename = "Other")]
    pub other: u64,
}

impl GenderDistribution {
    pub fn record(&mut self, gender: Gender) {
        match gender {
            Gender::Male => self.male += 1,
            Gender::Female => self.female += 1,
            Gender::Other => self.other += 1,
        }
    }
}

/// Aggregate statistics over every persisted submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_assessments: u64,
    pub average_age: f64,
    pub risk_distribution: RiskDistribution,
    pub gender_distribution: GenderDistribution,
    pub last_updated: DateTime<Utc>,
}

// ============ API Response Models ============

/// Payload returned for a successful assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentData {
    pub risk_level: String,
    pub bmi: Option<f64>,
    pub recommendations: Vec<String>,
    pub lifestyle_prediction: String,
    /// Storage key of the persisted submission.
    pub filename: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResponse {
    pub success: bool,
    pub message: String,
    pub data: AssessmentData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: StatsSnapshot,
}
