use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::prompts::{GenerationRequest, build_generation_prompt};

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("missing API key: set ANTHROPIC_API_KEY")]
    MissingApiKey,

    #[error("generation request failed: {0}")]
    Request(String),

    #[error("generation API error {0}: {1}")]
    Api(u16, String),

    #[error("malformed generation response: {0}")]
    MalformedResponse(String),

    #[error("could not build generation prompt: {0}")]
    Prompt(String),
}

/// Passage returned by the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedText {
    pub text_body: String,
    #[serde(default)]
    pub word_count: Option<i64>,
    #[serde(default)]
    pub sentence_count: Option<i64>,
    #[serde(default)]
    pub vocabulary_notes: Option<String>,
    #[serde(default)]
    pub lexile_estimate: Option<f64>,
}

impl GeneratedText {
    pub fn estimated_score(&self) -> Option<i64> {
        self.lexile_estimate.map(|score| score.round() as i64)
    }
}

pub trait TextGenerator {
    fn complete(&self, prompt: &str) -> Result<GeneratedText, GenerationError>;
}

/// Strips markdown code fences and parses the JSON passage payload.
pub fn parse_generation_response(content: &str) -> Result<GeneratedText, GenerationError> {
    let cleaned = content.replace("```json", "").replace("```", "");
    let generated: GeneratedText = serde_json::from_str(cleaned.trim())
        .map_err(|err| GenerationError::MalformedResponse(err.to_string()))?;
    if generated.text_body.trim().is_empty() {
        return Err(GenerationError::MalformedResponse(
            "text_body is empty".to_string(),
        ));
    }
    Ok(generated)
}

pub fn generate_text(
    generator: &dyn TextGenerator,
    catalog: &Catalog,
    request: &GenerationRequest,
) -> Result<GeneratedText, GenerationError> {
    let prompt = build_generation_prompt(catalog, request)
        .map_err(|err| GenerationError::Prompt(err.to_string()))?;
    debug!(
        band = %request.band,
        genre = %request.genre,
        length_type = %request.length_type,
        "requesting generated passage"
    );
    generator.complete(&prompt)
}

/// Outcome for one requested slot; failures do not stop the batch.
#[derive(Debug)]
pub struct SlotOutcome<T> {
    pub slot: T,
    pub result: Result<GeneratedText, GenerationError>,
}

pub fn batch_generate<T>(
    generator: &dyn TextGenerator,
    catalog: &Catalog,
    slots: Vec<(T, GenerationRequest)>,
) -> Vec<SlotOutcome<T>> {
    let total = slots.len();
    let mut outcomes = Vec::with_capacity(total);

    for (index, (slot, request)) in slots.into_iter().enumerate() {
        let result = generate_text(generator, catalog, &request);
        match &result {
            Ok(generated) => info!(
                step = index + 1,
                total,
                words = generated.word_count.unwrap_or_default(),
                "generated passage"
            ),
            Err(err) => warn!(step = index + 1, total, error = %err, "generation failed"),
        }
        outcomes.push(SlotOutcome { slot, result });
    }

    outcomes
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Messages API client.
pub struct AnthropicGenerator {
    http_client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicGenerator {
    pub fn new(api_key: String, model: String, max_tokens: u32) -> Result<Self, GenerationError> {
        if api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let http_client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| GenerationError::Request(err.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            model,
            max_tokens,
        })
    }

    pub fn from_env(model: String, max_tokens: u32) -> Result<Self, GenerationError> {
        let api_key = env::var(API_KEY_ENV).map_err(|_| GenerationError::MissingApiKey)?;
        Self::new(api_key, model, max_tokens)
    }
}

impl TextGenerator for AnthropicGenerator {
    fn complete(&self, prompt: &str) -> Result<GeneratedText, GenerationError> {
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .http_client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .map_err(|err| GenerationError::Request(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(GenerationError::Api(status.as_u16(), error_text));
        }

        let message: MessagesResponse = response
            .json()
            .map_err(|err| GenerationError::MalformedResponse(err.to_string()))?;
        let text = message
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| {
                GenerationError::MalformedResponse("response has no text block".to_string())
            })?;

        parse_generation_response(&text)
    }
}
