//! LLM provider seam and the Anthropic Messages API client behind it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::data_uri::DataUri;
use crate::error::{AstraError, Result};

pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_LLM_MODEL: &str = "claude-3-sonnet-20240229";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const LLM_TIMEOUT: Duration = Duration::from_secs(120);

/// One prompt plus any images to send alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    pub prompt: String,
    pub images: Vec<DataUri>,
    pub max_tokens: u32,
}

impl LlmRequest {
    pub fn text(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            prompt: prompt.into(),
            images: Vec::new(),
            max_tokens,
        }
    }

    pub fn with_image(mut self, image: DataUri) -> Self {
        self.images.push(image);
        self
    }
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the model's text answer.
    async fn complete(&self, request: LlmRequest) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentPart<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug)]
pub struct AnthropicClient {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_endpoint(api_key, DEFAULT_LLM_ENDPOINT, DEFAULT_LLM_MODEL)
    }

    pub fn with_endpoint(
        api_key: &str,
        endpoint: impl AsRef<str>,
        model: impl Into<String>,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AstraError::Config(
                "Anthropic API key not configured".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(api_key)
                .map_err(|_| AstraError::Config("API key contains invalid characters".into()))?,
        );
        headers.insert(
            HeaderName::from_static("anthropic-version"),
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(LLM_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: Url::parse(endpoint.as_ref())?,
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmProvider for AnthropicClient {
    async fn complete(&self, request: LlmRequest) -> Result<String> {
        let mut content: Vec<ContentPart<'_>> = request
            .images
            .iter()
            .map(|image| ContentPart::Image {
                source: ImageSource {
                    kind: "base64",
                    media_type: &image.media_type,
                    data: &image.data,
                },
            })
            .collect();
        content.push(ContentPart::Text {
            text: &request.prompt,
        });

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            messages: vec![Message {
                role: "user",
                content,
            }],
        };

        debug!(
            model = %self.model,
            images = request.images.len(),
            prompt_chars = request.prompt.len(),
            "calling LLM"
        );
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AstraError::Timeout(LLM_TIMEOUT)
                } else {
                    AstraError::Network(e)
                }
            })?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(AstraError::http(status.as_u16(), api_error_message(&text)));
        }

        let parsed: MessagesResponse = serde_json::from_str(&text)?;
        parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| AstraError::http(502, "Claude API error: response had no text content"))
    }
}

fn api_error_message(body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| "Unknown error".to_string());
    format!("Claude API error: {}", detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_a_config_error() {
        let err = AnthropicClient::new("  ").unwrap_err();
        assert!(matches!(err, AstraError::Config(_)));
    }

    #[test]
    fn image_parts_precede_text() {
        let image = DataUri::new("image/png", "AAAA");
        let content = vec![
            ContentPart::Image {
                source: ImageSource {
                    kind: "base64",
                    media_type: &image.media_type,
                    data: &image.data,
                },
            },
            ContentPart::Text { text: "hello" },
        ];
        let json = serde_json::to_value(&content).expect("serialize");
        assert_eq!(json[0]["type"], "image");
        assert_eq!(json[0]["source"]["type"], "base64");
        assert_eq!(json[0]["source"]["media_type"], "image/png");
        assert_eq!(json[1]["type"], "text");
        assert_eq!(json[1]["text"], "hello");
    }

    #[test]
    fn api_errors_carry_the_provider_message() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert_eq!(api_error_message(body), "Claude API error: Overloaded");
        assert_eq!(api_error_message("gateway down"), "Claude API error: Unknown error");
    }
}
