//! Client for the text completion API.
//!
//! One request carries one prompt and asks for a single choice; the first
//! choice's text is the result.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::models::GenerationConfig;

/// Request-level failures, classified the way the provider reports them
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("API error{}: {message}", status_suffix(.status))]
    Api { status: Option<u16>, message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

/// Seam between the answer generator and the remote model
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<String, ApiError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    n: u32,
    stop: Option<Vec<String>>,
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    text: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client for an OpenAI-style `/completions` endpoint
#[derive(Clone)]
pub struct OpenAiCompletionClient {
    client: Client,
    api_key: String,
    base_url: String,
    engine: String,
}

impl OpenAiCompletionClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        engine: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Connection(format!("Failed to create HTTP client: {e}")))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        let engine = engine.into();
        log::info!("Completion client: {} at {}", engine, base_url);

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url,
            engine,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, prompt: &str, config: &GenerationConfig) -> Result<String, ApiError> {
        let body = CompletionRequest {
            model: &self.engine,
            prompt,
            max_tokens: config.max_tokens,
            n: 1,
            stop: None,
            temperature: config.temperature,
            top_p: config.top_p,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_connect() || err.is_timeout() || err.is_request() {
                    ApiError::Connection(err.to_string())
                } else {
                    ApiError::Api {
                        status: err.status().map(|s| s.as_u16()),
                        message: err.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|err| ApiError::Api {
            status: Some(status.as_u16()),
            message: format!("Failed to parse completion response: {err}"),
        })?;

        first_choice_text(parsed)
    }
}

fn first_choice_text(response: CompletionResponse) -> Result<String, ApiError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.text)
        .ok_or_else(|| ApiError::Api {
            status: None,
            message: "Completion API returned no choices".to_string(),
        })
}

fn map_http_error(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::InvalidRequest(message)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Authentication(message),
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimit(message),
        _ => ApiError::Api {
            status: Some(status.as_u16()),
            message,
        },
    }
}
