//! Generative extraction capability: trait and provider implementations.
//!
//! Defines the [`Generator`] trait and concrete implementations:
//! - **[`DisabledGenerator`]** — returns errors; used when no provider is
//!   configured. Callers degrade to fallback records, so a run with the
//!   provider disabled still emits one row per document.
//! - **[`GeminiGenerator`]** — calls the Gemini `generateContent` API with a
//!   JSON response constraint and an optional response schema.
//! - **[`OpenAiGenerator`]** — calls the OpenAI chat completions API in JSON
//!   mode; the schema travels inside the prompt text.
//!
//! Callers must treat every provider as unreliable: no latency or
//! availability guarantee is assumed, and all errors are mapped to
//! deterministic fallbacks at the calling layer, never propagated to the
//! batch.
//!
//! # Retry Strategy
//!
//! Remote providers use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::ExtractionConfig;

/// A black-box capability: given a prompt and an optional target schema,
/// return a JSON payload approximating that schema.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Provider label used in diagnostics.
    fn name(&self) -> &str;

    /// Send one prompt and parse the provider's reply as JSON.
    async fn generate(&self, prompt: &str, response_schema: Option<&Value>) -> Result<Value>;
}

/// Instantiate the generator selected by the configuration.
pub fn create_generator(config: &ExtractionConfig) -> Result<Box<dyn Generator>> {
    match config.provider.as_str() {
        "gemini" => Ok(Box::new(GeminiGenerator::new(config)?)),
        "openai" => Ok(Box::new(OpenAiGenerator::new(config)?)),
        "disabled" => Ok(Box::new(DisabledGenerator)),
        other => bail!("Unknown extraction provider: {}", other),
    }
}

// ============ Disabled Generator ============

/// A no-op generator that always returns errors.
pub struct DisabledGenerator;

#[async_trait]
impl Generator for DisabledGenerator {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str, _response_schema: Option<&Value>) -> Result<Value> {
        bail!("Extraction provider is disabled")
    }
}

// ============ Gemini Generator ============

/// Generator backed by the Gemini `generateContent` endpoint.
///
/// Requires the `GEMINI_API_KEY` environment variable. The response is
/// requested as `application/json`, with the field schema attached as a
/// `responseSchema` constraint when one is provided.
pub struct GeminiGenerator {
    model: String,
    timeout_secs: u64,
    max_retries: u32,
    api_key: String,
}

impl GeminiGenerator {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;
        Ok(Self {
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            api_key,
        })
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str, response_schema: Option<&Value>) -> Result<Value> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let mut generation_config = serde_json::json!({
            "responseMimeType": "application/json",
        });
        if let Some(schema) = response_schema {
            generation_config["responseSchema"] = schema.clone();
        }
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        });

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response.json().await?;
                        return parse_gemini_response(&json);
                    }

                    // Rate limited or server error — retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("Gemini API error {}: {}", status, body_text));
                        continue;
                    }

                    // Client error (not 429) — don't retry
                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Gemini API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Gemini call failed after retries")))
    }
}

/// Pull the JSON payload out of a `generateContent` response.
///
/// The payload arrives as text inside the first candidate's first part and
/// must itself parse as JSON.
fn parse_gemini_response(json: &Value) -> Result<Value> {
    let text = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.pointer("/content/parts/0/text"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid Gemini response: missing candidate text"))?;

    serde_json::from_str(text)
        .map_err(|e| anyhow::anyhow!("Gemini returned malformed JSON payload: {}", e))
}

// ============ OpenAI Generator ============

/// Generator backed by the OpenAI chat completions API in JSON mode.
///
/// Requires the `OPENAI_API_KEY` environment variable. JSON mode guarantees
/// well-formed JSON but not schema conformance, so the schema is rendered
/// into the prompt and conformance is enforced by the caller's validator.
pub struct OpenAiGenerator {
    model: String,
    timeout_secs: u64,
    max_retries: u32,
    api_key: String,
}

impl OpenAiGenerator {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self {
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
            api_key,
        })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str, _response_schema: Option<&Value>) -> Result<Value> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "response_format": { "type": "json_object" },
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response.json().await?;
                        return parse_openai_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err =
                            Some(anyhow::anyhow!("OpenAI API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("OpenAI call failed after retries")))
    }
}

/// Pull the JSON payload out of a chat completions response.
fn parse_openai_response(json: &Value) -> Result<Value> {
    let content = json
        .pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing message content"))?;

    serde_json::from_str(content)
        .map_err(|e| anyhow::anyhow!("OpenAI returned malformed JSON payload: {}", e))
}
