//! Assessment session: one difficulty engine and one progress tracker per
//! domain, plus the session-wide answer counters.
//!
//! Domains are independent. Each slot exclusively owns its engine and
//! tracker, and answers are applied to the active domain one at a time.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::difficulty::{DifficultyEngine, DifficultyState, DifficultyUpdate};
use crate::error::AssessmentError;
use crate::model::{
    AnswerEvent, AssessmentDomain, DomainRecord, DomainStatus, MAX_DIFFICULTY, MIN_DIFFICULTY,
};
use crate::policy::AssessmentPolicy;
use crate::progress::DomainProgressTracker;
use crate::traits::ReportRequest;

#[derive(Debug)]
struct DomainSlot {
    domain: AssessmentDomain,
    /// Created when the domain is started.
    engine: Option<DifficultyEngine>,
    tracker: DomainProgressTracker,
}

/// Result of applying one answer to the active domain.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub domain_index: usize,
    pub is_correct: bool,
    pub update: DifficultyUpdate,
    pub status: DomainStatus,
    pub progress: f64,
}

impl AnswerOutcome {
    pub fn new_difficulty(&self) -> f64 {
        self.update.new_difficulty
    }

    /// Whether this answer finished the domain.
    pub fn finished(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A running assessment over a set of domains.
#[derive(Debug)]
pub struct AssessmentSession {
    id: Uuid,
    source: Option<String>,
    main_topic: String,
    started_at: DateTime<Utc>,
    policy: AssessmentPolicy,
    slots: Vec<DomainSlot>,
    active: Option<usize>,
    total_questions: u32,
    total_correct: u32,
}

impl AssessmentSession {
    /// Set up a session. Every domain starts NOT_STARTED.
    ///
    /// A domain without a difficulty estimate (zero) starts at the policy's
    /// default difficulty. Other estimates are clamped into
    /// [`MIN_DIFFICULTY`, `MAX_DIFFICULTY`]; a non-finite estimate is
    /// rejected.
    pub fn new(
        main_topic: impl Into<String>,
        domains: Vec<AssessmentDomain>,
        policy: AssessmentPolicy,
    ) -> Result<Self, AssessmentError> {
        policy.validate()?;
        if domains.is_empty() {
            return Err(AssessmentError::invalid("domains", "at least one domain is required"));
        }
        let mut seen = HashSet::new();
        for domain in &domains {
            if !seen.insert(domain.domain_name.as_str()) {
                return Err(AssessmentError::invalid(
                    "domains",
                    format!("duplicate domain name '{}'", domain.domain_name),
                ));
            }
        }

        let slots = domains
            .into_iter()
            .map(|domain| {
                let initial = starting_difficulty(&domain, &policy)?;
                Ok(DomainSlot {
                    tracker: DomainProgressTracker::new(
                        domain.domain_name.clone(),
                        initial,
                        policy.clone(),
                    ),
                    engine: None,
                    domain,
                })
            })
            .collect::<Result<Vec<_>, AssessmentError>>()?;

        Ok(Self {
            id: Uuid::new_v4(),
            source: None,
            main_topic: main_topic.into(),
            started_at: Utc::now(),
            policy,
            slots,
            active: None,
            total_questions: 0,
            total_correct: 0,
        })
    }

    /// Record the source material (e.g. a video URL) the session is about.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn main_topic(&self) -> &str {
        &self.main_topic
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn policy(&self) -> &AssessmentPolicy {
        &self.policy
    }

    pub fn domain_count(&self) -> usize {
        self.slots.len()
    }

    pub fn domains(&self) -> impl Iterator<Item = &AssessmentDomain> {
        self.slots.iter().map(|s| &s.domain)
    }

    pub fn records(&self) -> impl Iterator<Item = &DomainRecord> {
        self.slots.iter().map(|s| s.tracker.record())
    }

    pub fn index_of(&self, domain_name: &str) -> Result<usize, AssessmentError> {
        self.slots
            .iter()
            .position(|s| s.domain.domain_name == domain_name)
            .ok_or_else(|| AssessmentError::UnknownDomain(domain_name.to_string()))
    }

    fn slot(&self, index: usize) -> Result<&DomainSlot, AssessmentError> {
        self.slots
            .get(index)
            .ok_or(AssessmentError::DomainIndexOutOfRange {
                index,
                len: self.slots.len(),
            })
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut DomainSlot, AssessmentError> {
        let len = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(AssessmentError::DomainIndexOutOfRange { index, len })
    }

    pub fn domain(&self, index: usize) -> Result<&AssessmentDomain, AssessmentError> {
        self.slot(index).map(|s| &s.domain)
    }

    pub fn record(&self, index: usize) -> Result<&DomainRecord, AssessmentError> {
        self.slot(index).map(|s| s.tracker.record())
    }

    pub fn record_by_name(&self, domain_name: &str) -> Result<&DomainRecord, AssessmentError> {
        self.record(self.index_of(domain_name)?)
    }

    /// Difficulty state of a domain, once it has been started.
    pub fn difficulty_state(&self, index: usize) -> Result<Option<&DifficultyState>, AssessmentError> {
        self.slot(index).map(|s| s.engine.as_ref().map(|e| e.state()))
    }

    /// Index of the domain currently receiving answers.
    pub fn active_domain(&self) -> Option<usize> {
        self.active
    }

    /// Start a NOT_STARTED domain and make it the active one.
    pub fn start_domain(&mut self, index: usize) -> Result<&DomainRecord, AssessmentError> {
        let slot = self.slot_mut(index)?;
        let engine = DifficultyEngine::new(slot.tracker.record().current_difficulty)?;
        slot.tracker.start()?;
        slot.engine = Some(engine);
        self.active = Some(index);
        self.record(index)
    }

    /// Make an IN_PROGRESS domain active again, keeping its engine history.
    pub fn resume_domain(&mut self, index: usize) -> Result<&DomainRecord, AssessmentError> {
        let slot = self.slot(index)?;
        let name = &slot.domain.domain_name;
        match slot.tracker.status() {
            DomainStatus::InProgress => {}
            DomainStatus::NotStarted => return Err(AssessmentError::DomainNotStarted(name.clone())),
            _ => return Err(AssessmentError::DomainFinished(name.clone())),
        }
        self.active = Some(index);
        self.record(index)
    }

    /// Start the domain if it is new, otherwise resume it.
    pub fn enter_domain(&mut self, index: usize) -> Result<&DomainRecord, AssessmentError> {
        match self.record(index)?.status {
            DomainStatus::NotStarted => self.start_domain(index),
            _ => self.resume_domain(index),
        }
    }

    /// Apply one answer to the active domain.
    ///
    /// Every precondition is checked before anything is mutated, so an
    /// answer is either applied to the engine, the tracker, and the session
    /// counters together, or not at all.
    pub fn submit_answer(&mut self, event: &AnswerEvent) -> Result<AnswerOutcome, AssessmentError> {
        let index = self.active.ok_or(AssessmentError::NoActiveDomain)?;
        let slot = &mut self.slots[index];
        let engine = slot
            .engine
            .as_mut()
            .ok_or_else(|| AssessmentError::DomainNotStarted(slot.domain.domain_name.clone()))?;

        slot.tracker
            .check_answer(event, engine.current_difficulty())?;

        let update = engine.update_detailed(event)?;
        let record = slot.tracker.record_answer(event, update.new_difficulty)?;
        let outcome = AnswerOutcome {
            domain_index: index,
            is_correct: event.is_correct,
            update,
            status: record.status,
            progress: record.progress,
        };

        self.total_questions += 1;
        if event.is_correct {
            self.total_correct += 1;
        }
        if outcome.finished() {
            self.active = None;
        }

        Ok(outcome)
    }

    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    pub fn total_correct(&self) -> u32 {
        self.total_correct
    }

    pub fn overall_accuracy(&self) -> f64 {
        if self.total_questions == 0 {
            0.0
        } else {
            self.total_correct as f64 / self.total_questions as f64
        }
    }

    /// Domains that reached a terminal status, in session order.
    pub fn completed_domains(&self) -> Vec<&DomainRecord> {
        self.records().filter(|r| r.status.is_terminal()).collect()
    }

    /// True once every domain is terminal.
    pub fn is_finished(&self) -> bool {
        self.records().all(|r| r.status.is_terminal())
    }

    pub fn elapsed_ms(&self) -> u64 {
        (Utc::now() - self.started_at).num_milliseconds().max(0) as u64
    }

    /// Input for the report generator, covering the completed domains.
    pub fn report_request(&self) -> ReportRequest {
        ReportRequest {
            main_topic: self.main_topic.clone(),
            source: self.source.clone(),
            domains: self.completed_domains().into_iter().cloned().collect(),
            elapsed_ms: self.elapsed_ms(),
        }
    }

    /// Serializable copy of the whole session.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            source: self.source.clone(),
            main_topic: self.main_topic.clone(),
            started_at: self.started_at,
            policy: self.policy.clone(),
            domains: self
                .slots
                .iter()
                .map(|s| DomainSnapshot {
                    domain: s.domain.clone(),
                    record: s.tracker.record().clone(),
                    difficulty: s.engine.as_ref().map(|e| e.state().clone()),
                })
                .collect(),
            total_questions: self.total_questions,
            total_correct: self.total_correct,
        }
    }
}

fn starting_difficulty(
    domain: &AssessmentDomain,
    policy: &AssessmentPolicy,
) -> Result<f64, AssessmentError> {
    let estimate = domain.estimated_difficulty;
    if !estimate.is_finite() {
        return Err(AssessmentError::invalid(
            "estimated_difficulty",
            format!(
                "domain '{}': must be a finite number, got {estimate}",
                domain.domain_name
            ),
        ));
    }
    if estimate == 0.0 {
        return Ok(policy.default_difficulty);
    }
    Ok(estimate.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY))
}

/// One domain inside a [`SessionSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSnapshot {
    pub domain: AssessmentDomain,
    pub record: DomainRecord,
    #[serde(default)]
    pub difficulty: Option<DifficultyState>,
}

/// Point-in-time copy of a session, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    #[serde(default)]
    pub source: Option<String>,
    pub main_topic: String,
    pub started_at: DateTime<Utc>,
    pub policy: AssessmentPolicy,
    pub domains: Vec<DomainSnapshot>,
    pub total_questions: u32,
    pub total_correct: u32,
}

impl SessionSnapshot {
    /// Save the snapshot as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize session")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write session to {}", path.display()))?;
        Ok(())
    }

    /// Load a snapshot from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read session from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse session JSON")
    }

    pub fn records(&self) -> impl Iterator<Item = &DomainRecord> {
        self.domains.iter().map(|d| &d.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn domains() -> Vec<AssessmentDomain> {
        vec![
            AssessmentDomain {
                domain_name: "Ownership".into(),
                description: "moves and borrows".into(),
                estimated_difficulty: 35.0,
            },
            AssessmentDomain {
                domain_name: "Traits".into(),
                description: String::new(),
                estimated_difficulty: 0.0,
            },
        ]
    }

    fn session() -> AssessmentSession {
        AssessmentSession::new("Rust", domains(), AssessmentPolicy::default()).unwrap()
    }

    fn answer(is_correct: bool) -> AnswerEvent {
        AnswerEvent::new(is_correct, 10.0, 0.9, 30.0, "tag")
    }

    #[test]
    fn setup_marks_every_domain_not_started() {
        let session = session();
        assert_eq!(session.domain_count(), 2);
        assert!(session.records().all(|r| r.status == DomainStatus::NotStarted));
        assert_eq!(session.record(0).unwrap().current_difficulty, 35.0);
        // unset estimate falls back to the policy default
        assert_eq!(session.record(1).unwrap().current_difficulty, 50.0);
        assert!(session.difficulty_state(0).unwrap().is_none());
        assert_eq!(session.active_domain(), None);
    }

    #[test]
    fn out_of_range_estimates_are_clamped_consistently() {
        let domains = vec![
            AssessmentDomain {
                domain_name: "High".into(),
                description: String::new(),
                estimated_difficulty: 150.0,
            },
            AssessmentDomain {
                domain_name: "Low".into(),
                description: String::new(),
                estimated_difficulty: -20.0,
            },
        ];
        let mut session =
            AssessmentSession::new("Rust", domains, AssessmentPolicy::default()).unwrap();
        assert_eq!(session.record(0).unwrap().current_difficulty, MAX_DIFFICULTY);
        assert_eq!(session.record(1).unwrap().current_difficulty, MIN_DIFFICULTY);

        for index in 0..2 {
            session.start_domain(index).unwrap();
            let engine = session.difficulty_state(index).unwrap().unwrap().current_difficulty;
            assert_eq!(session.record(index).unwrap().current_difficulty, engine);
        }
        let snapshot = session.snapshot();
        assert_eq!(snapshot.domains[0].record.current_difficulty, 100.0);
        assert_eq!(snapshot.domains[1].record.current_difficulty, 1.0);
    }

    #[test]
    fn non_finite_estimate_is_rejected() {
        for estimate in [f64::NAN, f64::INFINITY] {
            let mut bad = domains();
            bad[0].estimated_difficulty = estimate;
            let err = AssessmentSession::new("Rust", bad, AssessmentPolicy::default())
                .err()
                .unwrap();
            assert!(matches!(
                err,
                AssessmentError::InvalidInput {
                    field: "estimated_difficulty",
                    ..
                }
            ));
        }
    }

    #[test]
    fn session_debug_lists_domains() {
        let debug = format!("{:?}", session());
        assert!(debug.contains("Ownership"));
        assert!(debug.contains("Traits"));
    }

    #[test]
    fn rejects_bad_setup() {
        assert!(AssessmentSession::new("Rust", vec![], AssessmentPolicy::default()).is_err());

        let mut dup = domains();
        dup[1].domain_name = "Ownership".into();
        assert!(AssessmentSession::new("Rust", dup, AssessmentPolicy::default()).is_err());

        let policy = AssessmentPolicy {
            required_questions: 0,
            ..Default::default()
        };
        assert!(matches!(
            AssessmentSession::new("Rust", domains(), policy),
            Err(AssessmentError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn answer_without_active_domain_fails() {
        let mut session = session();
        assert_eq!(
            session.submit_answer(&answer(true)).unwrap_err(),
            AssessmentError::NoActiveDomain
        );
    }

    #[test]
    fn first_answer_follows_engine_and_tracker() {
        let mut session = session();
        session.start_domain(1).unwrap();
        let outcome = session.submit_answer(&answer(true)).unwrap();

        assert_eq!(outcome.domain_index, 1);
        assert!(outcome.is_correct);
        assert!((outcome.new_difficulty() - 60.8).abs() < 1e-9);
        assert_eq!(outcome.status, DomainStatus::InProgress);
        assert_eq!(outcome.progress, 20.0);

        let record = session.record(1).unwrap();
        assert!((record.current_difficulty - 60.8).abs() < 1e-9);
        let state = session.difficulty_state(1).unwrap().unwrap();
        assert_eq!(state.consecutive_correct, 1);
        assert_eq!(session.total_questions(), 1);
        assert_eq!(session.total_correct(), 1);
    }

    #[test]
    fn finishing_a_domain_clears_active() {
        let mut session = session();
        session.start_domain(0).unwrap();
        for i in 0..5 {
            let outcome = session.submit_answer(&answer(true)).unwrap();
            assert_eq!(outcome.finished(), i == 4);
        }
        assert_eq!(session.record(0).unwrap().status, DomainStatus::Mastered);
        assert_eq!(session.active_domain(), None);
        assert_eq!(session.completed_domains().len(), 1);
        assert!(!session.is_finished());

        assert!(matches!(
            session.resume_domain(0),
            Err(AssessmentError::DomainFinished(_))
        ));
        assert!(session.start_domain(0).is_err());
    }

    #[test]
    fn domains_are_independent() {
        let mut session = session();
        session.start_domain(0).unwrap();
        session.submit_answer(&answer(false)).unwrap();
        session.start_domain(1).unwrap();
        session.submit_answer(&answer(true)).unwrap();
        session.resume_domain(0).unwrap();
        session.submit_answer(&answer(false)).unwrap();

        let first = session.difficulty_state(0).unwrap().unwrap();
        assert_eq!(first.consecutive_incorrect, 2);
        assert_eq!(first.recent_outcomes.len(), 2);
        let second = session.difficulty_state(1).unwrap().unwrap();
        assert_eq!(second.consecutive_correct, 1);

        let attempted: u32 = session.records().map(|r| r.questions_attempted).sum();
        assert_eq!(attempted, session.total_questions());
        assert_eq!(session.total_correct(), 1);
    }

    #[test]
    fn rejected_answer_changes_nothing() {
        let mut session = session();
        session.start_domain(0).unwrap();
        let bad = AnswerEvent::new(true, 10.0, 0.5, -5.0, "tag");
        assert!(session.submit_answer(&bad).is_err());
        assert_eq!(session.total_questions(), 0);
        assert_eq!(session.record(0).unwrap().questions_attempted, 0);
        assert!(session
            .difficulty_state(0)
            .unwrap()
            .unwrap()
            .recent_outcomes
            .is_empty());
    }

    #[test]
    fn lookups_by_name_and_index() {
        let session = session();
        assert_eq!(session.index_of("Traits").unwrap(), 1);
        assert!(matches!(
            session.index_of("Macros"),
            Err(AssessmentError::UnknownDomain(_))
        ));
        assert!(matches!(
            session.record(7),
            Err(AssessmentError::DomainIndexOutOfRange { index: 7, len: 2 })
        ));
        assert_eq!(session.record_by_name("Ownership").unwrap().domain_name, "Ownership");
    }

    #[test]
    fn enter_domain_starts_then_resumes() {
        let mut session = session();
        session.enter_domain(0).unwrap();
        session.submit_answer(&answer(true)).unwrap();
        session.enter_domain(1).unwrap();
        session.enter_domain(0).unwrap();
        assert_eq!(session.active_domain(), Some(0));
        assert_eq!(session.record(0).unwrap().questions_attempted, 1);
    }

    #[test]
    fn report_request_covers_completed_domains() {
        let mut session = session().with_source("https://youtu.be/abc");
        session.start_domain(0).unwrap();
        for _ in 0..5 {
            session.submit_answer(&answer(true)).unwrap();
        }
        session.start_domain(1).unwrap();
        session.submit_answer(&answer(false)).unwrap();

        let request = session.report_request();
        assert_eq!(request.main_topic, "Rust");
        assert_eq!(request.source.as_deref(), Some("https://youtu.be/abc"));
        assert_eq!(request.domains.len(), 1);
        assert_eq!(request.domains[0].domain_name, "Ownership");
    }

    #[test]
    fn snapshot_roundtrip() {
        let mut session = session();
        session.start_domain(0).unwrap();
        session.submit_answer(&answer(true)).unwrap();

        let snapshot = session.snapshot();
        assert!(snapshot.domains[0].difficulty.is_some());
        assert!(snapshot.domains[1].difficulty.is_none());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        snapshot.save_json(&path).unwrap();
        let loaded = SessionSnapshot::load_json(&path).unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(loaded.records().count(), 2);
    }
}
