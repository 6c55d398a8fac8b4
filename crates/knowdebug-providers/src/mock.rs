//! Mock generator for offline use and testing.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use knowdebug_core::model::{
    AssessmentDomain, DomainBreakdown, FinalReport, KnowledgeLevel, Question,
};
use knowdebug_core::traits::{
    AssessmentOutline, OutlineRequest, QuestionGenerator, QuestionRequest, ReportRequest,
};

/// Index of the correct option in every mock question.
pub const MOCK_CORRECT_INDEX: usize = 1;

/// A deterministic generator that needs no API.
///
/// Outlines four domains at difficulty 35, 50, 65 and 80; every question has
/// option B correct; reports are computed from the submitted records.
pub struct MockGenerator {
    main_topic: String,
    domain_count: u32,
    latency: Option<Duration>,
    /// Number of calls made, across all three operations.
    call_count: AtomicU32,
    last_question_request: Mutex<Option<QuestionRequest>>,
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            main_topic: "Mock Video Topic".to_string(),
            domain_count: 4,
            latency: None,
            call_count: AtomicU32::new(0),
            last_question_request: Mutex::new(None),
        }
    }

    /// Outline `count` domains instead of four.
    pub fn with_domain_count(mut self, count: u32) -> Self {
        self.domain_count = count;
        self
    }

    /// Sleep before every answer, to mimic a remote API.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Get the number of calls made to this generator.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last question request made to this generator.
    pub fn last_question_request(&self) -> Option<QuestionRequest> {
        self.last_question_request
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }

    async fn simulate_call(&self) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl QuestionGenerator for MockGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_outline(&self, request: &OutlineRequest) -> anyhow::Result<AssessmentOutline> {
        self.simulate_call().await;
        tracing::debug!(source = %request.source, "mock outline");

        let domains = (1..=self.domain_count)
            .map(|i| AssessmentDomain {
                domain_name: format!("Mock Domain {i} from Video"),
                description: format!(
                    "Mock description for domain {i}, derived from the source material."
                ),
                estimated_difficulty: (20 + 15 * i).min(100) as f64,
            })
            .collect();

        Ok(AssessmentOutline {
            main_topic: self.main_topic.clone(),
            domains,
        })
    }

    async fn generate_question(&self, request: &QuestionRequest) -> anyhow::Result<Question> {
        self.simulate_call().await;
        if let Ok(mut last) = self.last_question_request.lock() {
            *last = Some(request.clone());
        }

        let gaps = if request.knowledge_gaps.is_empty() {
            "None".to_string()
        } else {
            request.knowledge_gaps.join(", ")
        };

        Ok(Question {
            question: format!(
                "This is a mock question for the domain \"{}\". What is the correct option? Gaps to focus on: {gaps}",
                request.domain_name
            ),
            options: vec![
                "Mock Option A".into(),
                "Mock Option B (Correct)".into(),
                "Mock Option C".into(),
                "Mock Option D".into(),
            ],
            correct_answer_index: MOCK_CORRECT_INDEX,
            knowledge_tag: "Mock Video Knowledge".into(),
            explanation: "Mock Option B is correct because it was designated as such.".into(),
            difficulty_level: request.difficulty,
            estimated_time: 30,
        })
    }

    async fn generate_report(&self, request: &ReportRequest) -> anyhow::Result<FinalReport> {
        self.simulate_call().await;

        let detailed_breakdown: BTreeMap<String, DomainBreakdown> = request
            .domains
            .iter()
            .map(|d| {
                (
                    d.domain_name.clone(),
                    DomainBreakdown {
                        score: d.accuracy() * 100.0,
                        status: d.status.to_string(),
                        key_strengths: vec!["Mock Strength from video".into()],
                        improvement_areas: vec!["Mock Gap from video".into()],
                    },
                )
            })
            .collect();

        let accuracy = request.overall_accuracy();
        Ok(FinalReport {
            title: format!("Knowledge Assessment Report: {}", request.main_topic),
            overall_score: accuracy * 100.0,
            total_time_minutes: request.elapsed_minutes(),
            domains_assessed: request.domains.len() as u32,
            knowledge_level: KnowledgeLevel::from_accuracy(accuracy),
            strengths: vec!["Mock Strength: Core Concepts".into()],
            areas_for_improvement: vec!["Mock Weakness: Advanced Topics".into()],
            recommendations: vec![
                "Rewatch the middle part of the video.".into(),
                "Practice the main example shown in the video.".into(),
            ],
            detailed_breakdown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knowdebug_core::model::{DomainRecord, DomainStatus};

    #[tokio::test]
    async fn outline_has_four_graded_domains() {
        let generator = MockGenerator::new();
        let outline = generator
            .generate_outline(&OutlineRequest {
                source: "https://youtu.be/abc".into(),
            })
            .await
            .unwrap();

        assert_eq!(outline.main_topic, "Mock Video Topic");
        let difficulties: Vec<f64> = outline
            .domains
            .iter()
            .map(|d| d.estimated_difficulty)
            .collect();
        assert_eq!(difficulties, vec![35.0, 50.0, 65.0, 80.0]);
        assert_eq!(outline.domains[0].domain_name, "Mock Domain 1 from Video");
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn question_records_request() {
        let generator = MockGenerator::new();
        let request = QuestionRequest {
            domain_name: "Mock Domain 2 from Video".into(),
            difficulty: 57,
            knowledge_gaps: vec!["Mock Video Knowledge".into()],
            source: None,
        };
        let question = generator.generate_question(&request).await.unwrap();

        assert!(question.check_contract().is_ok());
        assert!(question.is_correct(1));
        assert_eq!(question.difficulty_level, 57);
        assert_eq!(question.estimated_time, 30);
        assert!(question.question.contains("Gaps to focus on: Mock Video Knowledge"));
        assert_eq!(generator.last_question_request(), Some(request));
    }

    #[tokio::test]
    async fn report_is_computed_from_records() {
        let generator = MockGenerator::new();
        let mut record = DomainRecord::new("Mock Domain 1 from Video", 35.0);
        record.status = DomainStatus::Completed;
        record.questions_attempted = 8;
        record.questions_correct = 5;

        let report = generator
            .generate_report(&ReportRequest {
                main_topic: "Mock Video Topic".into(),
                source: None,
                domains: vec![record],
                elapsed_ms: 120_000,
            })
            .await
            .unwrap();

        assert_eq!(report.title, "Knowledge Assessment Report: Mock Video Topic");
        assert_eq!(report.domains_assessed, 1);
        assert_eq!(report.knowledge_level, KnowledgeLevel::Intermediate);
        assert!((report.total_time_minutes - 2.0).abs() < 1e-12);
        let breakdown = &report.detailed_breakdown["Mock Domain 1 from Video"];
        assert!((breakdown.score - 62.5).abs() < 1e-9);
        assert_eq!(breakdown.status, "completed");
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_simulated() {
        let generator = MockGenerator::new()
            .with_domain_count(2)
            .with_latency(Duration::from_millis(500));
        let start = tokio::time::Instant::now();
        let outline = generator
            .generate_outline(&OutlineRequest { source: "s".into() })
            .await
            .unwrap();
        assert_eq!(outline.domains.len(), 2);
        assert!(start.elapsed() >= Duration::from_millis(500));
    }
}
