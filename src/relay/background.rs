//! The privileged side of the relay: the only code that talks HTTP to the
//! analysis gateway.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use super::protocol::{RelayAction, RelayRequest, RelayResponse};
use crate::error::{AstraError, Result};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CLIENT_HEADER: &str = "X-Extension-Request";
const USER_AGENT: &str = concat!("Astra-Extension/", env!("CARGO_PKG_VERSION"));

/// Serves relay requests inside the background task.
#[async_trait]
pub trait RelayHandler: Send + Sync {
    async fn handle(&self, request: RelayRequest) -> RelayResponse;
}

#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: Url,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(AstraError::Network)?;
        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn health_check(&self) -> Result<Value> {
        let url = self.endpoint("/api/health")?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn ai_analysis(&self, data: &Value) -> Result<Value> {
        let url = self.endpoint("/api/ai-analysis")?;
        if let Ok(body) = serde_json::to_vec(data) {
            debug!(kb = body.len() / 1024, "sending AI analysis payload");
        }
        self.send_json(self.http.post(url).json(data)).await
    }

    pub async fn analyze_design(&self, data: &Value) -> Result<Value> {
        let url = self.endpoint("/api/analyze-design")?;
        self.send_json(self.http.post(url).json(data)).await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<Value> {
        let response = request
            .header(CLIENT_HEADER, "true")
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        debug!(status = status.as_u16(), "backend responded");
        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if status.is_success() {
            return serde_json::from_str(&body).map_err(AstraError::Serialization);
        }
        Err(AstraError::http(status.as_u16(), error_details(status, &body)))
    }

    fn map_transport_error(&self, err: reqwest::Error) -> AstraError {
        if err.is_timeout() {
            AstraError::Timeout(self.timeout)
        } else {
            AstraError::Network(err)
        }
    }
}

/// Picks the most useful message out of a non-2xx body: the JSON `error`,
/// `message` or `details` field, else the raw text, else the status reason.
pub fn error_details(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => ["error", "message", "details"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| "Server error".to_string()),
        _ if !body.trim().is_empty() => body.trim().to_string(),
        _ => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
    }
}

#[async_trait]
impl RelayHandler for BackendClient {
    async fn handle(&self, request: RelayRequest) -> RelayResponse {
        let action = match request.action.parse::<RelayAction>() {
            Ok(action) => action,
            Err(message) => {
                warn!(action = %request.action, "unknown relay action");
                return RelayResponse {
                    id: request.id,
                    success: false,
                    data: None,
                    error: Some(message),
                    error_kind: None,
                    status: None,
                };
            }
        };

        info!(%action, id = %request.id, "relaying request to backend");
        let result = match action {
            RelayAction::HealthCheck => self.health_check().await,
            RelayAction::AiAnalysis => self.ai_analysis(&request.data).await,
            RelayAction::AnalyzeDesign => self.analyze_design(&request.data).await,
        };

        match result {
            Ok(data) => RelayResponse::ok(request.id, data),
            Err(err) => {
                warn!(%action, error = %err, "backend request failed");
                RelayResponse::failure(request.id, &err)
            }
        }
    }
}
