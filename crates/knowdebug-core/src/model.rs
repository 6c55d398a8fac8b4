//! Core data model types for knowdebug.
//!
//! These are the records the engine, the tracker, the generators, and the
//! report renderers all exchange.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AssessmentError;

/// Lowest difficulty a domain can be asked at.
pub const MIN_DIFFICULTY: f64 = 1.0;
/// Highest difficulty a domain can be asked at.
pub const MAX_DIFFICULTY: f64 = 100.0;

/// A single answered question, as fed to the engine and the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvent {
    /// Whether the chosen option was the correct one.
    pub is_correct: bool,
    /// Seconds the respondent took to answer.
    pub response_time: f64,
    /// Self-reported confidence in [0, 1].
    pub confidence: f64,
    /// Seconds a knowledgeable person is expected to need.
    pub estimated_time: f64,
    /// Knowledge area the question probes.
    pub knowledge_tag: String,
    /// Identifier of the question (its text, for generated questions).
    #[serde(default)]
    pub question_id: Option<String>,
    /// Index of the option the respondent picked.
    #[serde(default)]
    pub answer_index: Option<usize>,
}

impl AnswerEvent {
    pub fn new(
        is_correct: bool,
        response_time: f64,
        confidence: f64,
        estimated_time: f64,
        knowledge_tag: impl Into<String>,
    ) -> Self {
        Self {
            is_correct,
            response_time,
            confidence,
            estimated_time,
            knowledge_tag: knowledge_tag.into(),
            question_id: None,
            answer_index: None,
        }
    }

    /// Attach the question identity and the chosen option.
    pub fn with_question(mut self, question_id: impl Into<String>, answer_index: usize) -> Self {
        self.question_id = Some(question_id.into());
        self.answer_index = Some(answer_index);
        self
    }

    /// Check the input constraints of an answer event.
    ///
    /// `estimated_time` may be zero; the engine never divides by it directly.
    pub fn validate(&self) -> Result<(), AssessmentError> {
        if !self.response_time.is_finite() || self.response_time <= 0.0 {
            return Err(AssessmentError::invalid(
                "response_time",
                format!("must be a positive number of seconds, got {}", self.response_time),
            ));
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(AssessmentError::invalid(
                "confidence",
                format!("must be within [0, 1], got {}", self.confidence),
            ));
        }
        if !self.estimated_time.is_finite() || self.estimated_time < 0.0 {
            return Err(AssessmentError::invalid(
                "estimated_time",
                format!("must be zero or positive, got {}", self.estimated_time),
            ));
        }
        Ok(())
    }
}

/// An answer event as stored in a domain's response history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub answer_index: Option<usize>,
    pub is_correct: bool,
    pub response_time: f64,
    pub confidence: f64,
    pub knowledge_tag: String,
    pub timestamp: DateTime<Utc>,
}

impl ResponseRecord {
    pub fn from_event(event: &AnswerEvent, timestamp: DateTime<Utc>) -> Self {
        Self {
            question_id: event.question_id.clone(),
            answer_index: event.answer_index,
            is_correct: event.is_correct,
            response_time: event.response_time,
            confidence: event.confidence,
            knowledge_tag: event.knowledge_tag.clone(),
            timestamp,
        }
    }
}

/// Lifecycle status of one assessment domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainStatus {
    NotStarted,
    InProgress,
    Completed,
    Mastered,
    Struggling,
}

impl DomainStatus {
    /// Terminal statuses accept no further answers.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DomainStatus::Completed | DomainStatus::Mastered | DomainStatus::Struggling
        )
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainStatus::NotStarted => write!(f, "not_started"),
            DomainStatus::InProgress => write!(f, "in_progress"),
            DomainStatus::Completed => write!(f, "completed"),
            DomainStatus::Mastered => write!(f, "mastered"),
            DomainStatus::Struggling => write!(f, "struggling"),
        }
    }
}

impl FromStr for DomainStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "not_started" => Ok(DomainStatus::NotStarted),
            "in_progress" => Ok(DomainStatus::InProgress),
            "completed" => Ok(DomainStatus::Completed),
            "mastered" => Ok(DomainStatus::Mastered),
            "struggling" => Ok(DomainStatus::Struggling),
            other => Err(format!("unknown domain status: {other}")),
        }
    }
}

/// Accumulated progress of one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub domain_name: String,
    pub status: DomainStatus,
    /// Difficulty the next question for this domain should target.
    pub current_difficulty: f64,
    pub questions_attempted: u32,
    pub questions_correct: u32,
    #[serde(default)]
    pub response_history: Vec<ResponseRecord>,
    /// Tags of incorrectly answered questions, in answer order.
    #[serde(default)]
    pub knowledge_gaps: Vec<String>,
    /// Tags of correctly answered questions, in answer order.
    #[serde(default)]
    pub mastery_areas: Vec<String>,
    /// Mean response time in seconds over all answers.
    #[serde(default)]
    pub average_response_time: f64,
    /// Mean self-reported confidence over all answers.
    #[serde(default)]
    pub confidence_score: f64,
    /// Percentage of the domain completed, in [0, 100].
    pub progress: f64,
}

impl DomainRecord {
    pub fn new(domain_name: impl Into<String>, initial_difficulty: f64) -> Self {
        Self {
            domain_name: domain_name.into(),
            status: DomainStatus::NotStarted,
            current_difficulty: initial_difficulty,
            questions_attempted: 0,
            questions_correct: 0,
            response_history: Vec::new(),
            knowledge_gaps: Vec::new(),
            mastery_areas: Vec::new(),
            average_response_time: 0.0,
            confidence_score: 0.0,
            progress: 0.0,
        }
    }

    /// Fraction of attempted questions answered correctly (0 when none).
    pub fn accuracy(&self) -> f64 {
        if self.questions_attempted == 0 {
            0.0
        } else {
            self.questions_correct as f64 / self.questions_attempted as f64
        }
    }
}

/// A knowledge domain proposed by the generator for a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentDomain {
    pub domain_name: String,
    #[serde(default)]
    pub description: String,
    /// Starting difficulty. Zero means "not estimated" and falls back to the
    /// policy default; other finite values are clamped into
    /// [`MIN_DIFFICULTY`, `MAX_DIFFICULTY`]. Sessions reject NaN and
    /// infinite estimates.
    #[serde(default)]
    pub estimated_difficulty: f64,
}

/// A generated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
    pub knowledge_tag: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty_level: u32,
    /// Seconds a knowledgeable person needs to answer.
    #[serde(default)]
    pub estimated_time: u32,
}

/// Every question has exactly this many options.
pub const OPTION_COUNT: usize = 4;

impl Question {
    /// Check the field contract a generated question must satisfy.
    pub fn check_contract(&self) -> Result<(), AssessmentError> {
        if self.question.trim().is_empty() {
            return Err(AssessmentError::invalid("question", "text is empty"));
        }
        if self.options.len() != OPTION_COUNT {
            return Err(AssessmentError::invalid(
                "options",
                format!("expected {OPTION_COUNT} options, got {}", self.options.len()),
            ));
        }
        if self.correct_answer_index >= OPTION_COUNT {
            return Err(AssessmentError::invalid(
                "correct_answer_index",
                format!("must be in 0..={}, got {}", OPTION_COUNT - 1, self.correct_answer_index),
            ));
        }
        if self.knowledge_tag.trim().is_empty() {
            return Err(AssessmentError::invalid("knowledge_tag", "tag is empty"));
        }
        Ok(())
    }

    pub fn is_correct(&self, answer_index: usize) -> bool {
        answer_index == self.correct_answer_index
    }
}

/// Overall knowledge level of a respondent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnowledgeLevel {
    #[serde(alias = "beginner", alias = "BEGINNER")]
    Beginner,
    #[serde(alias = "intermediate", alias = "INTERMEDIATE")]
    Intermediate,
    #[serde(alias = "advanced", alias = "ADVANCED")]
    Advanced,
    #[serde(alias = "expert", alias = "EXPERT")]
    Expert,
}

impl KnowledgeLevel {
    /// Map an overall accuracy in [0, 1] to a knowledge level.
    ///
    /// Bands: up to 40% Beginner, up to 70% Intermediate, up to 85% Advanced,
    /// above that Expert.
    pub fn from_accuracy(accuracy: f64) -> Self {
        match accuracy {
            a if a <= 0.40 => KnowledgeLevel::Beginner,
            a if a <= 0.70 => KnowledgeLevel::Intermediate,
            a if a <= 0.85 => KnowledgeLevel::Advanced,
            _ => KnowledgeLevel::Expert,
        }
    }
}

impl fmt::Display for KnowledgeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnowledgeLevel::Beginner => write!(f, "Beginner"),
            KnowledgeLevel::Intermediate => write!(f, "Intermediate"),
            KnowledgeLevel::Advanced => write!(f, "Advanced"),
            KnowledgeLevel::Expert => write!(f, "Expert"),
        }
    }
}

/// Per-domain section of a final report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainBreakdown {
    pub score: f64,
    pub status: String,
    #[serde(default)]
    pub key_strengths: Vec<String>,
    #[serde(default)]
    pub improvement_areas: Vec<String>,
}

/// The end-of-session report produced by the generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub title: String,
    /// Overall score in [0, 100].
    pub overall_score: f64,
    pub total_time_minutes: f64,
    pub domains_assessed: u32,
    pub knowledge_level: KnowledgeLevel,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub detailed_breakdown: BTreeMap<String, DomainBreakdown>,
}

impl FinalReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse report JSON")
    }
}
