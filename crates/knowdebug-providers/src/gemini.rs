//! Google Gemini API backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use knowdebug_core::GeneratorError;

use crate::generator::JsonBackend;
use crate::http::{build_client, check_status, send_error};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Gemini `generateContent` backend with JSON response mode.
pub struct GeminiBackend {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: &str, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client: build_client(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    response_schema: &'a Value,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl JsonBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt, schema), fields(model = %self.model))]
    async fn complete_json(&self, prompt: &str, schema: &Value) -> anyhow::Result<String> {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error(e, DEFAULT_TIMEOUT_SECS))?;
        let response = check_status(response, &self.model).await?;

        let api_response: GeminiResponse =
            response
                .json()
                .await
                .map_err(|e| GeneratorError::MalformedResponse {
                    what: "Gemini response",
                    reason: e.to_string(),
                })?;

        let candidate = api_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GeneratorError::MalformedResponse {
                what: "Gemini response",
                reason: "no candidates".into(),
            })?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(GeneratorError::MalformedResponse {
                what: "Gemini response",
                reason: format!(
                    "empty candidate (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ),
            }
            .into());
        }
        Ok(text)
    }
}
