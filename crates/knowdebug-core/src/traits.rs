//! The content generator interface.
//!
//! Question and report generation is an external capability (usually an
//! LLM). The `knowdebug-providers` crate implements it; the core only
//! depends on this trait and the request/response records below.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{
    AssessmentDomain, DomainBreakdown, DomainRecord, DomainStatus, FinalReport, KnowledgeLevel,
    Question,
};

// ---------------------------------------------------------------------------
// Generator trait
// ---------------------------------------------------------------------------

/// Trait for backends that generate assessment content.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    /// Human-readable generator name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Break source material into a main topic and assessable domains.
    async fn generate_outline(&self, request: &OutlineRequest) -> anyhow::Result<AssessmentOutline>;

    /// Generate one multiple-choice question for a domain.
    async fn generate_question(&self, request: &QuestionRequest) -> anyhow::Result<Question>;

    /// Summarize a finished assessment.
    async fn generate_report(&self, request: &ReportRequest) -> anyhow::Result<FinalReport>;
}

/// Request to outline an assessment for some source material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineRequest {
    /// Where the material lives (e.g. a video URL).
    pub source: String,
}

/// Main topic and domains proposed for a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentOutline {
    pub main_topic: String,
    pub domains: Vec<AssessmentDomain>,
}

/// Request for the next question of a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub domain_name: String,
    /// Target difficulty, 1..=100.
    pub difficulty: u32,
    /// Tags the respondent got wrong so far, oldest first.
    #[serde(default)]
    pub knowledge_gaps: Vec<String>,
    #[serde(default)]
    pub source: Option<String>,
}

impl QuestionRequest {
    /// Build a request targeting a domain's current difficulty.
    pub fn for_domain(record: &DomainRecord, source: Option<&str>) -> Self {
        Self {
            domain_name: record.domain_name.clone(),
            difficulty: record.current_difficulty.round().clamp(1.0, 100.0) as u32,
            knowledge_gaps: record.knowledge_gaps.clone(),
            source: source.map(str::to_string),
        }
    }
}

/// Request for the final report of an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub main_topic: String,
    #[serde(default)]
    pub source: Option<String>,
    /// Completed domain records.
    pub domains: Vec<DomainRecord>,
    /// Wall-clock duration of the session.
    pub elapsed_ms: u64,
}

impl ReportRequest {
    pub fn total_questions(&self) -> u32 {
        self.domains.iter().map(|d| d.questions_attempted).sum()
    }

    pub fn total_correct(&self) -> u32 {
        self.domains.iter().map(|d| d.questions_correct).sum()
    }

    pub fn overall_accuracy(&self) -> f64 {
        let total = self.total_questions();
        if total == 0 {
            0.0
        } else {
            self.total_correct() as f64 / total as f64
        }
    }

    pub fn elapsed_minutes(&self) -> f64 {
        self.elapsed_ms as f64 / 60_000.0
    }

    /// Report built from the records alone, without a generator.
    ///
    /// Strengths are the MASTERED domains and improvement areas the
    /// STRUGGLING ones; per-domain entries list the distinct tags seen.
    pub fn statistics_report(&self) -> FinalReport {
        let accuracy = self.overall_accuracy();
        let named = |status: DomainStatus| -> Vec<String> {
            self.domains
                .iter()
                .filter(|d| d.status == status)
                .map(|d| d.domain_name.clone())
                .collect()
        };

        let detailed_breakdown: BTreeMap<String, DomainBreakdown> = self
            .domains
            .iter()
            .map(|d| {
                (
                    d.domain_name.clone(),
                    DomainBreakdown {
                        score: d.accuracy() * 100.0,
                        status: d.status.to_string(),
                        key_strengths: distinct(&d.mastery_areas),
                        improvement_areas: distinct(&d.knowledge_gaps),
                    },
                )
            })
            .collect();

        let recommendations = self
            .domains
            .iter()
            .flat_map(|d| {
                distinct(&d.knowledge_gaps)
                    .into_iter()
                    .map(move |gap| format!("Review {gap} ({})", d.domain_name))
            })
            .take(5)
            .collect();

        FinalReport {
            title: format!("Knowledge Assessment Report: {}", self.main_topic),
            overall_score: accuracy * 100.0,
            total_time_minutes: self.elapsed_minutes(),
            domains_assessed: self.domains.len() as u32,
            knowledge_level: KnowledgeLevel::from_accuracy(accuracy),
            strengths: named(DomainStatus::Mastered),
            areas_for_improvement: named(DomainStatus::Struggling),
            recommendations,
            detailed_breakdown,
        }
    }
}

/// Tags in first-seen order, without repeats.
fn distinct(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .filter(|t| seen.insert(t.as_str()))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// JSON payload extraction
// ---------------------------------------------------------------------------

/// Extract a JSON document from a model response.
///
/// Handles:
/// - ```json fenced blocks (the first one wins)
/// - Generic ``` blocks (if no json-specific block is found)
/// - Raw JSON with no fences (returned trimmed)
pub fn extract_json_payload(response: &str) -> &str {
    let mut generic: Option<&str> = None;
    let mut rest = response;

    while let Some(open) = rest.find("```") {
        let after_ticks = &rest[open + 3..];
        let line_end = after_ticks.find('\n').unwrap_or(after_ticks.len());
        let lang = after_ticks[..line_end].trim().to_lowercase();
        let body_start = (line_end + 1).min(after_ticks.len());
        let body = &after_ticks[body_start..];

        // Unclosed fences (truncated output) run to the end of the response
        let (block, next) = match body.find("```") {
            Some(close) => (&body[..close], &body[close + 3..]),
            None => (body, ""),
        };

        if lang == "json" {
            return block.trim();
        }
        if lang.is_empty() && generic.is_none() {
            generic = Some(block.trim());
        }
        rest = next;
    }

    generic.unwrap_or_else(|| response.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_block() {
        let input = "Here you go:\n\n```json\n{\"a\": 1}\n```\n\nEnjoy!";
        assert_eq!(extract_json_payload(input), "{\"a\": 1}");
    }

    #[test]
    fn extract_raw_json() {
        let input = "  {\"a\": 1}\n";
        assert_eq!(extract_json_payload(input), "{\"a\": 1}");
    }

    #[test]
    fn extract_generic_block_fallback() {
        let input = "```\n{\"b\": 2}\n```";
        assert_eq!(extract_json_payload(input), "{\"b\": 2}");
    }

    #[test]
    fn extract_prefers_json_over_generic() {
        let input = "```\nnot this\n```\n\n```JSON\n{\"c\": 3}\n```\n";
        assert_eq!(extract_json_payload(input), "{\"c\": 3}");
    }

    #[test]
    fn extract_truncated_unclosed_block() {
        let input = "```json\n{\"d\": 4";
        assert_eq!(extract_json_payload(input), "{\"d\": 4");
    }

    #[test]
    fn extract_ignores_other_languages() {
        let input = "```python\nprint(1)\n```\n{\"e\": 5}";
        assert_eq!(extract_json_payload(input), input.trim());
    }

    #[test]
    fn question_request_rounds_difficulty() {
        let mut record = DomainRecord::new("Traits", 60.8);
        record.knowledge_gaps.push("dyn".into());
        let request = QuestionRequest::for_domain(&record, Some("https://youtu.be/x"));
        assert_eq!(request.difficulty, 61);
        assert_eq!(request.knowledge_gaps, vec!["dyn".to_string()]);
        assert_eq!(request.source.as_deref(), Some("https://youtu.be/x"));
    }

    #[test]
    fn report_request_accuracy() {
        let mut a = DomainRecord::new("A", 50.0);
        a.questions_attempted = 6;
        a.questions_correct = 5;
        let mut b = DomainRecord::new("B", 50.0);
        b.questions_attempted = 4;
        b.questions_correct = 1;
        let request = ReportRequest {
            main_topic: "Rust".into(),
            source: None,
            domains: vec![a, b],
            elapsed_ms: 312_000,
        };
        assert_eq!(request.total_questions(), 10);
        assert!((request.overall_accuracy() - 0.6).abs() < 1e-12);
        assert!((request.elapsed_minutes() - 5.2).abs() < 1e-12);
    }

    #[test]
    fn statistics_report_from_records() {
        let mut mastered = DomainRecord::new("Ownership", 50.0);
        mastered.status = DomainStatus::Mastered;
        mastered.questions_attempted = 5;
        mastered.questions_correct = 5;
        mastered.mastery_areas = vec!["moves".into(), "moves".into(), "borrows".into()];
        let mut struggling = DomainRecord::new("Traits", 50.0);
        struggling.status = DomainStatus::Struggling;
        struggling.questions_attempted = 10;
        struggling.questions_correct = 5;
        struggling.knowledge_gaps = vec!["dyn".into(), "coherence".into(), "dyn".into()];

        let report = ReportRequest {
            main_topic: "Rust".into(),
            source: None,
            domains: vec![mastered, struggling],
            elapsed_ms: 60_000,
        }
        .statistics_report();

        assert_eq!(report.title, "Knowledge Assessment Report: Rust");
        assert!((report.overall_score - 66.666_666_666).abs() < 1e-6);
        assert_eq!(report.knowledge_level, KnowledgeLevel::Intermediate);
        assert_eq!(report.strengths, vec!["Ownership"]);
        assert_eq!(report.areas_for_improvement, vec!["Traits"]);
        assert_eq!(report.recommendations, vec!["Review dyn (Traits)", "Review coherence (Traits)"]);
        let ownership = &report.detailed_breakdown["Ownership"];
        assert_eq!(ownership.key_strengths, vec!["moves", "borrows"]);
        assert_eq!(ownership.status, "mastered");
        assert_eq!(report.detailed_breakdown["Traits"].score, 50.0);
    }
}
