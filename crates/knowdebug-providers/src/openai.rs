//! OpenAI-compatible chat completions backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use knowdebug_core::GeneratorError;

use crate::generator::JsonBackend;
use crate::http::{build_client, check_status, send_error};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const SYSTEM_PROMPT: &str = "You generate assessment content. Respond ONLY with a single JSON object that follows the shape given in the prompt. Do not add explanations or markdown.";

/// OpenAI-compatible API backend using JSON mode.
pub struct OpenAiBackend {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    model: String,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(
        api_key: &str,
        base_url: Option<String>,
        org_id: Option<String>,
        model: Option<String>,
    ) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            org_id,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client: build_client(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    temperature: f64,
    response_format: ResponseFormat,
    messages: Vec<OpenAiMessage<'a>>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl JsonBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    // JSON mode does not take a schema; the prompt carries the shape.
    #[instrument(skip(self, prompt, _schema), fields(model = %self.model))]
    async fn complete_json(&self, prompt: &str, _schema: &Value) -> anyhow::Result<String> {
        let body = OpenAiRequest {
            model: &self.model,
            temperature: 0.7,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![
                OpenAiMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                OpenAiMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let mut req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(org) = &self.org_id {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, DEFAULT_TIMEOUT_SECS))?;
        let response = check_status(response, &self.model).await?;

        let api_response: OpenAiResponse =
            response
                .json()
                .await
                .map_err(|e| GeneratorError::MalformedResponse {
                    what: "OpenAI response",
                    reason: e.to_string(),
                })?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                GeneratorError::MalformedResponse {
                    what: "OpenAI response",
                    reason: "no message content".into(),
                }
                .into()
            })
    }
}
