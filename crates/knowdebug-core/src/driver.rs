//! Assessment driver.
//!
//! Runs the question loop of an assessment: ask the generator for a question
//! at the domain's current difficulty, collect an answer from a respondent,
//! feed it to the session, repeat until the domain finishes. Transient
//! generator failures are retried with exponential backoff.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::{AssessmentError, GeneratorError};
use crate::model::{AnswerEvent, DomainRecord, FinalReport, Question};
use crate::policy::AssessmentPolicy;
use crate::session::{AnswerOutcome, AssessmentSession};
use crate::traits::{OutlineRequest, QuestionGenerator, QuestionRequest};

/// Configuration for the assessment driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Retries on generator errors (not on respondent errors).
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub retry_delay: Duration,
    /// Stop a domain after this many questions even if unfinished.
    pub max_questions_per_domain: Option<u32>,
    /// Policy for sessions created by [`AssessmentDriver::begin`].
    pub policy: AssessmentPolicy,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            max_questions_per_domain: None,
            policy: AssessmentPolicy::default(),
        }
    }
}

/// A respondent's answer to one question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Answer {
    pub answer_index: usize,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Seconds taken to answer.
    pub response_time: f64,
}

/// Whoever answers the questions (a terminal user, a script, a test).
#[async_trait]
pub trait Respondent: Send {
    /// Answer a question, or return `None` to leave the domain.
    async fn answer(&mut self, question: &Question, record: &DomainRecord)
        -> Result<Option<Answer>>;
}

/// Progress reporting trait.
pub trait ProgressReporter: Send + Sync {
    fn on_question(&self, domain: &str, question: &Question);
    fn on_answer(&self, domain: &str, question: &Question, outcome: &AnswerOutcome);
    fn on_domain_complete(&self, record: &DomainRecord);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_question(&self, _: &str, _: &Question) {}
    fn on_answer(&self, _: &str, _: &Question, _: &AnswerOutcome) {}
    fn on_domain_complete(&self, _: &DomainRecord) {}
}

/// Drives sessions against a generator.
pub struct AssessmentDriver {
    generator: Arc<dyn QuestionGenerator>,
    config: DriverConfig,
}

impl AssessmentDriver {
    pub fn new(generator: Arc<dyn QuestionGenerator>, config: DriverConfig) -> Self {
        Self { generator, config }
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Outline the source material and set up a session for it.
    pub async fn begin(&self, source: &str) -> Result<AssessmentSession> {
        let request = OutlineRequest {
            source: source.to_string(),
        };
        let outline = self
            .with_retry("outline", || self.generator.generate_outline(&request))
            .await?;
        anyhow::ensure!(
            !outline.domains.is_empty(),
            "generator proposed no domains for {source}"
        );
        tracing::info!(
            topic = %outline.main_topic,
            domains = outline.domains.len(),
            "assessment outlined"
        );

        let session =
            AssessmentSession::new(outline.main_topic, outline.domains, self.config.policy.clone())?
                .with_source(source);
        Ok(session)
    }

    /// Generate the next question for the session's active domain.
    pub async fn next_question(&self, session: &AssessmentSession) -> Result<Question> {
        let index = session
            .active_domain()
            .ok_or(AssessmentError::NoActiveDomain)?;
        let request = &QuestionRequest::for_domain(session.record(index)?, session.source());

        self.with_retry("question", || async move {
            let question = self.generator.generate_question(request).await?;
            question
                .check_contract()
                .map_err(|e| GeneratorError::MalformedResponse {
                    what: "question",
                    reason: e.to_string(),
                })?;
            Ok::<_, anyhow::Error>(question)
        })
        .await
    }

    /// Run one domain until it finishes, the respondent leaves, or the
    /// question cap is hit. Returns the domain record at that point.
    pub async fn run_domain(
        &self,
        session: &mut AssessmentSession,
        index: usize,
        respondent: &mut dyn Respondent,
        progress: &dyn ProgressReporter,
    ) -> Result<DomainRecord> {
        let domain_name = session.enter_domain(index)?.domain_name.clone();
        let mut asked = 0u32;

        while !session.record(index)?.status.is_terminal() {
            if let Some(max) = self.config.max_questions_per_domain {
                if asked >= max {
                    tracing::info!(domain = %domain_name, asked, "question cap reached");
                    break;
                }
            }

            let question = self.next_question(session).await?;
            progress.on_question(&domain_name, &question);

            let Some(answer) = respondent.answer(&question, session.record(index)?).await? else {
                tracing::info!(domain = %domain_name, "respondent left the domain");
                break;
            };
            anyhow::ensure!(
                answer.answer_index < question.options.len(),
                "answer index {} out of range for {} options",
                answer.answer_index,
                question.options.len()
            );

            let event = AnswerEvent::new(
                question.is_correct(answer.answer_index),
                answer.response_time,
                answer.confidence,
                question.estimated_time as f64,
                question.knowledge_tag.clone(),
            )
            .with_question(question.question.clone(), answer.answer_index);

            let outcome = session.submit_answer(&event)?;
            progress.on_answer(&domain_name, &question, &outcome);
            asked += 1;
        }

        let record = session.record(index)?.clone();
        if record.status.is_terminal() {
            progress.on_domain_complete(&record);
        }
        Ok(record)
    }

    /// Ask the generator for the final report over completed domains.
    pub async fn final_report(&self, session: &AssessmentSession) -> Result<FinalReport> {
        let request = session.report_request();
        anyhow::ensure!(
            !request.domains.is_empty(),
            "no completed domains to report on"
        );
        self.with_retry("report", || self.generator.generate_report(&request))
            .await
    }

    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;
        let mut retry_delay = self.config.retry_delay;

        for retry in 0..=self.config.max_retries {
            if retry > 0 {
                tokio::time::sleep(retry_delay).await;
                retry_delay = (retry_delay * 2).min(Duration::from_secs(60));
            }
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if let Some(gen_err) = e.downcast_ref::<GeneratorError>() {
                        if gen_err.is_permanent() {
                            return Err(e);
                        }
                        // Use the generator's retry-after hint if available
                        if let Some(ms) = gen_err.retry_after_ms() {
                            retry_delay = Duration::from_millis(ms);
                        }
                    }
                    tracing::warn!(
                        generator = self.generator.name(),
                        attempt = retry + 1,
                        "{what} generation failed: {e:#}"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("{what} generation failed")))
    }
}
