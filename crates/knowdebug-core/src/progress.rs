//! Per-domain progress tracking and the status state machine.
//!
//! ```text
//! NOT_STARTED --start--> IN_PROGRESS --progress reaches 100--> MASTERED
//!                                                            | COMPLETED
//!                                                            | STRUGGLING
//! ```
//!
//! Terminal statuses are final. Only correct answers earn progress; every
//! answer counts toward accuracy.

use chrono::Utc;

use crate::error::AssessmentError;
use crate::model::{
    AnswerEvent, DomainRecord, DomainStatus, ResponseRecord, MAX_DIFFICULTY, MIN_DIFFICULTY,
};
use crate::policy::AssessmentPolicy;

/// Final status for a finished domain with the given accuracy.
///
/// Both thresholds are inclusive.
pub fn classify(accuracy: f64, policy: &AssessmentPolicy) -> DomainStatus {
    match accuracy {
        a if a >= policy.mastered_accuracy => DomainStatus::Mastered,
        a if a >= policy.completed_accuracy => DomainStatus::Completed,
        _ => DomainStatus::Struggling,
    }
}

/// Owns the [`DomainRecord`] of one domain.
#[derive(Debug, Clone)]
pub struct DomainProgressTracker {
    record: DomainRecord,
    policy: AssessmentPolicy,
}

impl DomainProgressTracker {
    pub fn new(
        domain_name: impl Into<String>,
        initial_difficulty: f64,
        policy: AssessmentPolicy,
    ) -> Self {
        Self {
            record: DomainRecord::new(domain_name, initial_difficulty),
            policy,
        }
    }

    /// Read-only view of the domain record.
    pub fn record(&self) -> &DomainRecord {
        &self.record
    }

    pub fn status(&self) -> DomainStatus {
        self.record.status
    }

    /// Move the domain from NOT_STARTED to IN_PROGRESS.
    pub fn start(&mut self) -> Result<(), AssessmentError> {
        match self.record.status {
            DomainStatus::NotStarted => {
                self.record.status = DomainStatus::InProgress;
                tracing::info!(domain = %self.record.domain_name, "domain started");
                Ok(())
            }
            DomainStatus::InProgress => Err(AssessmentError::DomainAlreadyStarted(
                self.record.domain_name.clone(),
            )),
            _ => Err(AssessmentError::DomainFinished(
                self.record.domain_name.clone(),
            )),
        }
    }

    /// Check that `record_answer` would accept this input, without mutating.
    pub fn check_answer(
        &self,
        event: &AnswerEvent,
        new_difficulty: f64,
    ) -> Result<(), AssessmentError> {
        match self.record.status {
            DomainStatus::InProgress => {}
            DomainStatus::NotStarted => {
                return Err(AssessmentError::DomainNotStarted(
                    self.record.domain_name.clone(),
                ))
            }
            _ => {
                return Err(AssessmentError::DomainFinished(
                    self.record.domain_name.clone(),
                ))
            }
        }
        event.validate()?;
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&new_difficulty) {
            return Err(AssessmentError::invalid(
                "new_difficulty",
                format!("must be within [{MIN_DIFFICULTY}, {MAX_DIFFICULTY}], got {new_difficulty}"),
            ));
        }
        Ok(())
    }

    /// Record one answer together with the engine's new difficulty.
    pub fn record_answer(
        &mut self,
        event: &AnswerEvent,
        new_difficulty: f64,
    ) -> Result<&DomainRecord, AssessmentError> {
        self.check_answer(event, new_difficulty)?;

        let record = &mut self.record;
        record
            .response_history
            .push(ResponseRecord::from_event(event, Utc::now()));

        record.questions_attempted += 1;
        if event.is_correct {
            record.questions_correct += 1;
            record.mastery_areas.push(event.knowledge_tag.clone());
        } else {
            record.knowledge_gaps.push(event.knowledge_tag.clone());
        }

        // Equivalent to adding 100 / required per correct answer, without drift.
        record.progress = (record.questions_correct as f64 * 100.0
            / self.policy.required_questions as f64)
            .min(100.0);

        let n = record.questions_attempted as f64;
        record.average_response_time += (event.response_time - record.average_response_time) / n;
        record.confidence_score += (event.confidence - record.confidence_score) / n;

        record.current_difficulty = new_difficulty;

        if record.progress >= 100.0 {
            let accuracy = record.accuracy();
            record.status = classify(accuracy, &self.policy);
            tracing::info!(
                domain = %record.domain_name,
                accuracy,
                status = %record.status,
                "domain finished"
            );
        }

        Ok(&self.record)
    }
}
