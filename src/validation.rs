/// Questionnaire validation
///
/// Checks required fields, the gender enumeration and numeric fields. Every
/// problem is collected so the client can fix the whole form in one round trip.
use crate::models::{
    is_blank, numeric_value, FieldError, Gender, Submission, NUMERIC_FIELDS, REQUIRED_FIELDS,
};
use serde_json::Value;

/// Validate a raw submission.
///
/// Returns an empty list when the submission is acceptable.
pub fn validate(submission: &Submission) -> Vec<FieldError> {
    let mut errors = Vec::new();

    for field in REQUIRED_FIELDS {
        match submission.get(field) {
            None => errors.push(required_error(field)),
            Some(value) if is_blank(value) => errors.push(required_error(field)),
            Some(value) if field == "gender" && !is_valid_gender(value) => {
                errors.push(FieldError::new("gender", "Invalid gender value"));
            }
            Some(_) => {}
        }
    }

    for field in NUMERIC_FIELDS {
        let Some(value) = submission.get(field) else {
            continue;
        };
        if matches!(value, Value::String(s) if s.is_empty()) {
            continue;
        }
        if numeric_value(value).is_none() {
            errors.push(FieldError::new(
                field,
                format!("{} must be a valid number", display_name(field)),
            ));
        }
    }

    if !errors.is_empty() {
        tracing::debug!(
            "Submission failed validation on fields: {:?}",
            errors.iter().map(|e| e.field.as_str()).collect::<Vec<_>>()
        );
    }

    errors
}

fn is_valid_gender(value: &Value) -> bool {
    value.as_str().and_then(Gender::from_label).is_some()
}

fn required_error(field: &str) -> FieldError {
    FieldError::new(field, format!("{} is required", display_name(field)))
}

/// Field name as shown in messages: first letter upper-cased, rest lower-cased.
fn display_name(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
