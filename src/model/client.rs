//! Model client for AI inference using OpenAI-compatible API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

use super::vision::VisionModel;

/// Default number of retry attempts for failed requests.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay between retry attempts in seconds.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;

/// Text left in place of a screenshot once it has been stripped from a message.
pub const SCREENSHOT_PLACEHOLDER: &str = "[screenshot omitted]";

/// Model client errors.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Max retries exceeded after {0} attempts: {1}")]
    MaxRetriesExceeded(u32, String),
}

/// Configuration for the AI model.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub base_url: String,
    pub api_key: String,
    pub model_name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub extra_body: HashMap<String, Value>,
    /// Maximum number of retry attempts for failed requests.
    pub max_retries: u32,
    /// Delay between retry attempts in seconds.
    pub retry_delay_secs: u64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            api_key: "EMPTY".to_string(),
            model_name: "gui-owl-7b".to_string(),
            max_tokens: 2048,
            temperature: 0.0,
            top_p: 0.85,
            extra_body: HashMap::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            timeout_secs: 120,
        }
    }
}

impl ModelConfig {
    /// Create a new ModelConfig with custom base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Create a new ModelConfig with custom API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Create a new ModelConfig with custom model name.
    pub fn with_model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }

    /// Set the maximum number of retry attempts for failed requests.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay between retry attempts in seconds.
    pub fn with_retry_delay(mut self, delay_secs: u64) -> Self {
        self.retry_delay_secs = delay_secs;
        self
    }
}

/// OpenAI API response structures.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// Client for interacting with OpenAI-compatible vision-language models.
pub struct ModelClient {
    config: ModelConfig,
    client: Client,
}

impl ModelClient {
    /// Create a new ModelClient with the given configuration.
    pub fn new(config: ModelConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { config, client }
    }

    /// Create a new ModelClient with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ModelConfig::default())
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Send a chat completion request and return the raw reply text.
    ///
    /// Retryable failures (network errors, 5xx, 429) are retried up to
    /// `max_retries` times with a fixed delay.
    pub async fn request(&self, messages: &[Value]) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let mut body = json!({
            "messages": messages,
            "model": self.config.model_name,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
        });

        if let Value::Object(ref mut map) = body {
            for (key, value) in &self.config.extra_body {
                map.insert(key.clone(), value.clone());
            }
        }

        let mut last_error: Option<ModelError> = None;
        let max_attempts = self.config.max_retries + 1;

        for attempt in 1..=max_attempts {
            match self.send_request(&url, &body).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    if !Self::is_retryable_error(&e) {
                        return Err(e);
                    }
                    if attempt < max_attempts {
                        tracing::warn!(
                            attempt,
                            max_attempts,
                            "Model request failed: {}; retrying in {}s",
                            e,
                            self.config.retry_delay_secs
                        );
                        sleep(Duration::from_secs(self.config.retry_delay_secs)).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(ModelError::MaxRetriesExceeded(
            self.config.max_retries,
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
        ))
    }

    /// Check if an error is retryable (network errors, timeouts, etc.)
    fn is_retryable_error(error: &ModelError) -> bool {
        match error {
            ModelError::RequestFailed(_) => true,
            ModelError::ApiError(msg) => {
                let lower = msg.to_lowercase();
                ["500", "502", "503", "504", "429"]
                    .iter()
                    .any(|code| msg.contains(code))
                    || lower.contains("timeout")
                    || lower.contains("rate limit")
            }
            ModelError::ParseError(_) => false,
            ModelError::MaxRetriesExceeded(_, _) => false,
        }
    }

    /// Send a single request to the API.
    async fn send_request(&self, url: &str, body: &Value) -> Result<String, ModelError> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ModelError::ApiError(format!("{}: {}", status.as_u16(), error_text)));
        }

        let completion: ChatCompletionResponse = response.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ModelError::ParseError("No content in response".to_string()))
    }
}

#[async_trait]
impl VisionModel for ModelClient {
    async fn predict(&self, prompt: &str, images: &[String]) -> Result<String, ModelError> {
        let message = MessageBuilder::create_user_message_with_images(prompt, images);
        self.request(&[message]).await
    }

    async fn predict_with_context(&self, messages: &[Value]) -> Result<String, ModelError> {
        self.request(messages).await
    }
}

/// Helper class for building conversation messages.
pub struct MessageBuilder;

impl MessageBuilder {
    /// Create a system message.
    pub fn create_system_message(content: &str) -> Value {
        json!({
            "role": "system",
            "content": content
        })
    }

    /// Create a user message with optional image.
    pub fn create_user_message(text: &str, image_base64: Option<&str>) -> Value {
        match image_base64 {
            Some(img) => Self::create_user_message_with_images(text, &[img.to_string()]),
            None => Self::create_user_message_with_images(text, &[]),
        }
    }

    /// Create a user message carrying the text followed by every image in order.
    pub fn create_user_message_with_images(text: &str, images: &[String]) -> Value {
        let mut content = vec![json!({
            "type": "text",
            "text": text
        })];

        for img_data in images {
            content.push(json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:image/png;base64,{}", img_data)
                }
            }));
        }

        json!({
            "role": "user",
            "content": content
        })
    }

    /// Create an assistant message.
    pub fn create_assistant_message(content: &str) -> Value {
        json!({
            "role": "assistant",
            "content": content
        })
    }

    /// Replace every image part of a message with a text placeholder.
    ///
    /// Returns true if at least one image was removed.
    pub fn strip_images_from_message(message: &mut Value) -> bool {
        let Some(Value::Array(parts)) = message.get_mut("content") else {
            return false;
        };

        let mut stripped = false;
        for part in parts.iter_mut() {
            let is_image = part
                .get("type")
                .and_then(|t| t.as_str())
                .map(|t| t == "image_url")
                .unwrap_or(false);
            if is_image {
                *part = json!({ "type": "text", "text": SCREENSHOT_PLACEHOLDER });
                stripped = true;
            }
        }
        stripped
    }

    /// Role of a message ("system", "user", "assistant"), if present.
    pub fn role_of(message: &Value) -> Option<&str> {
        message.get("role").and_then(|r| r.as_str())
    }

    /// Count the image parts of a message.
    pub fn image_count(message: &Value) -> usize {
        message
            .get("content")
            .and_then(|c| c.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter(|p| p.get("type").and_then(|t| t.as_str()) == Some("image_url"))
                    .count()
            })
            .unwrap_or(0)
    }
}
