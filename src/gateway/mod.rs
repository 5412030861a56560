//! Remote Analysis Gateway: stateless HTTP handlers that forward analysis
//! payloads to the LLM and hand back its text.
//!
//! Every route answers `OPTIONS` with an empty 200, rejects unexpected
//! methods with 405, and carries permissive CORS headers so the relay (or a
//! browser extension) can call it from any origin.

pub mod llm;
pub mod prompts;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::data_uri::DataUri;
use crate::error::{AstraError, Result};
use crate::types::{AnalysisMetadata, AnalysisResult};

pub use llm::{AnthropicClient, LlmProvider, LlmRequest, DEFAULT_LLM_ENDPOINT, DEFAULT_LLM_MODEL};

pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const SERVICE_NAME: &str = "Astra Backend API";
pub const MISSING_KEY_MESSAGE: &str = "Anthropic API key not configured";

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Gateway settings, normally read from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub bind: SocketAddr,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            endpoint: DEFAULT_LLM_ENDPOINT.to_string(),
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}

impl GatewayConfig {
    /// Reads `ANTHROPIC_API_KEY` (falling back to `CLAUDE_API_KEY`),
    /// `ASTRA_LLM_MODEL`, `ASTRA_LLM_ENDPOINT` and `ASTRA_BIND`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let bind = match non_empty("ASTRA_BIND") {
            Some(raw) => raw
                .parse()
                .map_err(|_| AstraError::Config(format!("Invalid ASTRA_BIND address: {}", raw)))?,
            None => defaults.bind,
        };

        Ok(Self {
            api_key: non_empty("ANTHROPIC_API_KEY").or_else(|| non_empty("CLAUDE_API_KEY")),
            model: non_empty("ASTRA_LLM_MODEL").unwrap_or(defaults.model),
            endpoint: non_empty("ASTRA_LLM_ENDPOINT").unwrap_or(defaults.endpoint),
            bind,
        })
    }
}

/// Shared handler state. `llm` is `None` when no API key is configured;
/// analysis routes then answer 500 without calling out.
#[derive(Clone, Default)]
pub struct GatewayState {
    llm: Option<Arc<dyn LlmProvider>>,
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("llm_configured", &self.llm.is_some())
            .finish()
    }
}

impl GatewayState {
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let llm = match &config.api_key {
            Some(key) => {
                let client =
                    AnthropicClient::with_endpoint(key, &config.endpoint, config.model.clone())?;
                Some(Arc::new(client) as Arc<dyn LlmProvider>)
            }
            None => {
                warn!("no Anthropic API key found; analysis routes will return 500");
                None
            }
        };
        Ok(Self { llm })
    }

    pub fn with_provider(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm: Some(provider),
        }
    }

    pub fn unconfigured() -> Self {
        Self::default()
    }
}

pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route(
            "/api/health",
            get(health)
                .post(health)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/ai-analysis",
            post(ai_analysis)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/analyze-design",
            post(analyze_design)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
        .with_state(state)
}

/// Binds `config.bind` and serves until `shutdown` is cancelled.
pub async fn serve(config: GatewayConfig, shutdown: CancellationToken) -> Result<()> {
    let state = GatewayState::from_config(&config)?;
    let listener = TcpListener::bind(config.bind).await?;
    serve_on(listener, state, shutdown).await
}

/// Serves on an already bound listener. In-flight requests finish before
/// this returns after cancellation.
pub async fn serve_on(
    listener: TcpListener,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "analysis gateway listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!(%addr, "analysis gateway stopped");
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisRequest {
    #[serde(default)]
    dom_styles: Option<Vec<Value>>,
    #[serde(default)]
    accessibility_results: Option<Value>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    screenshot: Option<String>,
    #[serde(default)]
    design_screenshot: Option<String>,
    #[serde(default)]
    page_screenshot: Option<String>,
}

impl AnalysisRequest {
    fn styles(&self) -> &[Value] {
        self.dom_styles.as_deref().unwrap_or(&[])
    }

    fn url(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }

    fn metadata(&self) -> AnalysisMetadata {
        AnalysisMetadata {
            dom_elements_analyzed: self.styles().len(),
            accessibility_violations: self
                .accessibility_results
                .as_ref()
                .and_then(|r| r.get("violations"))
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0),
            url: self.url().to_string(),
        }
    }
}

/// Parses an optional image field. Anything that is not a base64 data URI
/// is skipped rather than failing the request.
fn image_part(field: &str, value: Option<&str>) -> Option<DataUri> {
    let raw = value?;
    match raw.parse::<DataUri>() {
        Ok(uri) => Some(uri),
        Err(err) => {
            warn!(field, error = %err, "ignoring malformed image data URI");
            None
        }
    }
}

fn error_response(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "service": SERVICE_NAME,
        "cors": "enabled",
    }))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        json!({ "error": "Method not allowed" }),
    )
}

async fn ai_analysis(
    State(state): State<GatewayState>,
    body: std::result::Result<Json<AnalysisRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_json(rejection),
    };
    let Some(llm) = state.llm.clone() else {
        return missing_key();
    };

    let prompt = prompts::ai_analysis_prompt(
        request.url(),
        request.styles(),
        request.accessibility_results.as_ref(),
    );
    let mut llm_request = LlmRequest::text(prompt, prompts::AI_ANALYSIS_MAX_TOKENS);
    if let Some(image) = image_part("screenshot", request.screenshot.as_deref()) {
        llm_request = llm_request.with_image(image);
    }

    complete(
        llm.as_ref(),
        llm_request,
        request.metadata(),
        "Failed to generate AI analysis",
    )
    .await
}

async fn analyze_design(
    State(state): State<GatewayState>,
    body: std::result::Result<Json<AnalysisRequest>, JsonRejection>,
) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => return bad_json(rejection),
    };
    let Some(llm) = state.llm.clone() else {
        return missing_key();
    };

    let prompt = prompts::design_analysis_prompt(request.url(), request.styles());
    let mut llm_request = LlmRequest::text(prompt, prompts::DESIGN_ANALYSIS_MAX_TOKENS);
    if let Some(image) = image_part("designScreenshot", request.design_screenshot.as_deref()) {
        llm_request = llm_request.with_image(image);
    }
    let page = request
        .page_screenshot
        .as_deref()
        .or(request.screenshot.as_deref());
    if let Some(image) = image_part("screenshot", page) {
        llm_request = llm_request.with_image(image);
    }

    complete(
        llm.as_ref(),
        llm_request,
        request.metadata(),
        "Failed to analyze design",
    )
    .await
}

async fn complete(
    llm: &dyn LlmProvider,
    request: LlmRequest,
    metadata: AnalysisMetadata,
    failure: &str,
) -> Response {
    match llm.complete(request).await {
        Ok(analysis) => {
            info!(
                url = %metadata.url,
                elements = metadata.dom_elements_analyzed,
                "analysis complete"
            );
            let result = AnalysisResult {
                success: true,
                analysis,
                timestamp: Utc::now(),
                metadata: Some(metadata),
            };
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(err) => {
            error!(error = %err, "{}", failure);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": failure, "details": err.to_string() }),
            )
        }
    }
}

fn missing_key() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": MISSING_KEY_MESSAGE }),
    )
}

fn bad_json(rejection: JsonRejection) -> Response {
    warn!(error = %rejection.body_text(), "rejecting malformed request body");
    error_response(
        StatusCode::BAD_REQUEST,
        json!({ "error": rejection.body_text() }),
    )
}
