//! Assessment policy: the product-tuned constants of domain completion.

use serde::{Deserialize, Serialize};

use crate::error::AssessmentError;
use crate::model::{MAX_DIFFICULTY, MIN_DIFFICULTY};

/// How many correct answers finish a domain, and how accuracy maps to a
/// final status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentPolicy {
    /// Correct answers needed to reach 100% progress.
    #[serde(default = "default_required_questions")]
    pub required_questions: u32,
    /// Minimum accuracy (inclusive) for MASTERED.
    #[serde(default = "default_mastered_accuracy")]
    pub mastered_accuracy: f64,
    /// Minimum accuracy (inclusive) for COMPLETED.
    #[serde(default = "default_completed_accuracy")]
    pub completed_accuracy: f64,
    /// Starting difficulty for domains without an estimate.
    #[serde(default = "default_difficulty")]
    pub default_difficulty: f64,
}

fn default_required_questions() -> u32 {
    5
}
fn default_mastered_accuracy() -> f64 {
    0.8
}
fn default_completed_accuracy() -> f64 {
    0.6
}
fn default_difficulty() -> f64 {
    50.0
}

impl Default for AssessmentPolicy {
    fn default() -> Self {
        Self {
            required_questions: default_required_questions(),
            mastered_accuracy: default_mastered_accuracy(),
            completed_accuracy: default_completed_accuracy(),
            default_difficulty: default_difficulty(),
        }
    }
}

impl AssessmentPolicy {
    pub fn validate(&self) -> Result<(), AssessmentError> {
        if self.required_questions == 0 {
            return Err(AssessmentError::InvalidPolicy(
                "required_questions must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("mastered_accuracy", self.mastered_accuracy),
            ("completed_accuracy", self.completed_accuracy),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AssessmentError::InvalidPolicy(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.completed_accuracy > self.mastered_accuracy {
            return Err(AssessmentError::InvalidPolicy(format!(
                "completed_accuracy ({}) exceeds mastered_accuracy ({})",
                self.completed_accuracy, self.mastered_accuracy
            )));
        }
        if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&self.default_difficulty) {
            return Err(AssessmentError::InvalidPolicy(format!(
                "default_difficulty must be within [{MIN_DIFFICULTY}, {MAX_DIFFICULTY}], got {}",
                self.default_difficulty
            )));
        }
        Ok(())
    }

    /// Progress earned by one correct answer, in percent.
    pub fn progress_increment(&self) -> f64 {
        100.0 / self.required_questions as f64
    }
}
