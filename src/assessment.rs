/// Health assessment workflow shared by the HTTP handler and tests
///
/// 1. Validate the raw questionnaire
/// 2. Enrich it with BMI and request metadata
/// 3. Build the report
/// 4. Predict the risk label and assign it into the report
/// 5. Persist the record with its report
use crate::enrichment::enrich;
use crate::errors::{AppError, ResultExt};
use crate::models::{EnrichedRecord, HealthReport, PersistedSubmission, Submission};
use crate::predictor::PredictorAdapter;
use crate::report::generate_report;
use crate::storage::SubmissionStore;
use crate::validation::validate;

/// Result of a successfully processed submission.
#[derive(Debug, Clone)]
pub struct AssessmentOutcome {
    pub record: EnrichedRecord,
    pub report: HealthReport,
    /// Label exactly as the classifier returned it.
    pub prediction: String,
    pub storage_key: String,
}

pub struct AssessmentService<'a> {
    predictor: &'a PredictorAdapter,
    store: &'a SubmissionStore,
}

impl<'a> AssessmentService<'a> {
    pub fn new(predictor: &'a PredictorAdapter, store: &'a SubmissionStore) -> Self {
        Self { predictor, store }
    }

    /// Run one submission through the whole pipeline.
    ///
    /// Nothing is written unless validation and prediction both succeed.
    pub async fn process(
        &self,
        submission: &Submission,
        origin_address: &str,
    ) -> Result<AssessmentOutcome, AppError> {
        let errors = validate(submission);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let record = enrich(submission, origin_address);
        let mut report = generate_report(&record);

        let prediction = self.predictor.predict(&record)?;
        report.overall_risk_level = prediction.clone();

        tracing::info!(
            "Assessment from {} predicted '{}' (bmi: {:?})",
            origin_address,
            prediction,
            record.bmi
        );

        let persisted = PersistedSubmission {
            record,
            health_report: report,
        };
        let storage_key = self
            .store
            .save(&persisted)
            .await
            .context("Failed to persist health assessment")?;

        Ok(AssessmentOutcome {
            record: persisted.record,
            report: persisted.health_report,
            prediction,
            storage_key,
        })
    }
}
