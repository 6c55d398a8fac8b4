//! Prompt-driven generator on top of a JSON-completion backend.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::instrument;

use knowdebug_core::model::{FinalReport, Question};
use knowdebug_core::traits::{
    extract_json_payload, AssessmentOutline, OutlineRequest, QuestionGenerator, QuestionRequest,
    ReportRequest,
};
use knowdebug_core::GeneratorError;

use crate::prompts;

/// An LLM API that answers a prompt with a JSON document.
#[async_trait]
pub trait JsonBackend: Send + Sync {
    /// Backend name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Model identifier sent to the API.
    fn model(&self) -> &str;

    /// Send a prompt and return the raw text of the model's answer.
    ///
    /// `schema` describes the expected document; backends that cannot
    /// enforce a schema may ignore it.
    async fn complete_json(&self, prompt: &str, schema: &Value) -> anyhow::Result<String>;
}

/// [`QuestionGenerator`] that builds prompts, sends them to a backend, and
/// parses the JSON it returns.
pub struct PromptedGenerator<B> {
    backend: B,
}

impl<B: JsonBackend> PromptedGenerator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn complete<T: DeserializeOwned>(
        &self,
        what: &'static str,
        prompt: &str,
        schema: &Value,
    ) -> anyhow::Result<T> {
        let raw = self.backend.complete_json(prompt, schema).await?;
        let payload = extract_json_payload(&raw);
        serde_json::from_str(payload).map_err(|e| {
            tracing::debug!(backend = self.backend.name(), %raw, "unparseable {what}");
            GeneratorError::MalformedResponse {
                what,
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl<B: JsonBackend> QuestionGenerator for PromptedGenerator<B> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    #[instrument(skip(self, request), fields(backend = self.backend.name(), model = self.backend.model()))]
    async fn generate_outline(&self, request: &OutlineRequest) -> anyhow::Result<AssessmentOutline> {
        let outline: AssessmentOutline = self
            .complete(
                "outline",
                &prompts::outline_prompt(request),
                &prompts::outline_schema(),
            )
            .await?;
        if outline.domains.is_empty() {
            return Err(GeneratorError::MalformedResponse {
                what: "outline",
                reason: "no domains".into(),
            }
            .into());
        }
        Ok(outline)
    }

    #[instrument(skip(self, request), fields(backend = self.backend.name(), domain = %request.domain_name, difficulty = request.difficulty))]
    async fn generate_question(&self, request: &QuestionRequest) -> anyhow::Result<Question> {
        let question: Question = self
            .complete(
                "question",
                &prompts::question_prompt(request),
                &prompts::question_schema(),
            )
            .await?;
        question
            .check_contract()
            .map_err(|e| GeneratorError::MalformedResponse {
                what: "question",
                reason: e.to_string(),
            })?;
        Ok(question)
    }

    #[instrument(skip(self, request), fields(backend = self.backend.name(), domains = request.domains.len()))]
    async fn generate_report(&self, request: &ReportRequest) -> anyhow::Result<FinalReport> {
        self.complete(
            "report",
            &prompts::report_prompt(request),
            &prompts::report_schema(),
        )
        .await
    }
}
