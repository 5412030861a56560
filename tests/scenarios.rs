use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use astra_lib::gateway::llm::{LlmProvider, LlmRequest};
use astra_lib::gateway::serve_on;
use astra_lib::types::{ComputedStyle, DomNode, DomSnapshot};
use astra_lib::{
    assemble, connect_backend, element_html, enforce_budget, generate_fix, survey, survey_with,
    AnalysisOptions, AstraError, AxeOutcome, Budget, Document, ErrorCategory, GatewayState,
    PageCapture, PageContext, RelayOptions, SurveyOptions, Violation,
};

fn styled(display: &str) -> ComputedStyle {
    ComputedStyle {
        font_size: Some("16px".into()),
        color: Some("rgb(17, 24, 39)".into()),
        display: Some(display.into()),
        ..ComputedStyle::default()
    }
}

#[test]
fn survey_skips_hidden_elements() {
    let mut dom = DomSnapshot::new("https://example.com");
    dom.push(
        DomNode::new("hidden", "div")
            .with_attr("class", "modal")
            .with_style(styled("none")),
        None,
    )
    .push(
        DomNode::new("cta", "button")
            .with_text("Buy")
            .with_rect(10.0, 10.0, 100.0, 40.0)
            .with_style(styled("inline-block")),
        None,
    )
    .push(
        DomNode::new("title", "h1")
            .with_text("Welcome")
            .with_rect(0.0, 60.0, 600.0, 48.0)
            .with_style(styled("block")),
        None,
    );
    let doc = Document::from_snapshot(dom);

    let records = survey(&doc);
    let tags: Vec<&str> = records.iter().map(|r| r.tag_name.as_str()).collect();
    assert_eq!(tags, vec!["h1", "button"]);
}

#[test]
fn image_alt_fix_adds_placeholder_text() {
    let mut dom = DomSnapshot::new("https://example.com");
    dom.push(
        DomNode::new("logo", "img")
            .with_attr("src", "logo.png")
            .with_rect(0.0, 0.0, 64.0, 64.0),
        None,
    );
    let doc = Document::from_snapshot(dom);
    let element = doc
        .query_selector("img")
        .expect("valid selector")
        .expect("img present")
        .to_fragment();
    let violation: Violation = serde_json::from_value(json!({
        "id": "image-alt",
        "impact": "critical"
    }))
    .expect("violation");

    let current = element_html(Some(&element));
    let fixed = generate_fix(Some(&element), &violation);
    assert_eq!(current, "<img src=\"logo.png\">");
    assert!(fixed.contains("alt=\"Descriptive alt text"));
    assert!(!fixed.contains(&current));
}

#[test]
fn oversized_payload_sheds_styles_then_screenshot() {
    let mut dom = DomSnapshot::new("https://example.com");
    for i in 0..300 {
        dom.push(
            DomNode::new(format!("card-{i}"), "section")
                .with_attr("class", "card card--elevated")
                .with_rect(0.0, i as f32 * 50.0, 320.0, 48.0)
                .with_style(styled("block")),
            None,
        );
    }
    let doc = Document::from_snapshot(dom);
    let styles = survey_with(
        &doc,
        &SurveyOptions {
            max_elements: 300,
            ..SurveyOptions::default()
        },
    );
    assert_eq!(styles.len(), 300);

    let screenshot = format!("data:image/png;base64,{}", "A".repeat(1_100_000));
    let payload = assemble(styles, None, "https://example.com", Some(screenshot));
    assert!(payload.byte_len() > 1_150_000);

    let trimmed = enforce_budget(payload, Budget::AI_ANALYSIS);
    assert!(trimmed.dom_styles.len() <= 100);
    assert!(trimmed.screenshot.is_none());
    assert!(trimmed.byte_len() < Budget::AI_ANALYSIS.max_bytes);
}

fn capture() -> PageCapture {
    let mut dom = DomSnapshot::new("https://example.com");
    dom.push(
        DomNode::new("body", "body").with_rect(0.0, 0.0, 1280.0, 720.0),
        None,
    )
    .push(
        DomNode::new("cta", "button")
            .with_text("Start")
            .with_rect(20.0, 20.0, 120.0, 40.0),
        Some("body"),
    );
    PageCapture {
        url: "https://example.com".into(),
        title: None,
        dom,
        screenshot: Some("data:image/png;base64,iVBORw0KGgo=".into()),
        axe: AxeOutcome::Ok {
            results: json!({"violations": [], "passes": [], "incomplete": []}),
        },
    }
}

async fn spawn_gateway(state: GatewayState) -> (String, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        let _ = serve_on(listener, state, token).await;
    });
    (format!("http://{addr}"), shutdown)
}

#[tokio::test]
async fn missing_api_key_surfaces_as_configuration_error() {
    let (base, shutdown) = spawn_gateway(GatewayState::unconfigured()).await;
    let relay = connect_backend(&base, RelayOptions::default())
        .await
        .expect("relay");

    let health = relay.health_check().await.expect("health");
    assert_eq!(health["status"], "healthy");

    let page = PageContext::new(capture());
    let err = page
        .ai_analysis(&relay, &AnalysisOptions::default())
        .await
        .unwrap_err();
    let panel = err.to_payload();
    assert_eq!(panel.category, ErrorCategory::Config);
    assert_eq!(panel.title, "Configuration Error");
    assert!(panel.message.contains("API key"));
    shutdown.cancel();
}

#[derive(Default)]
struct RecordingLlm {
    prompts: Mutex<Vec<LlmRequest>>,
}

#[async_trait]
impl LlmProvider for RecordingLlm {
    async fn complete(&self, request: LlmRequest) -> astra_lib::Result<String> {
        self.prompts.lock().push(request);
        Ok("<h2>Overall</h2><p>Solid contrast.</p>".to_string())
    }
}

#[tokio::test]
async fn analysis_round_trips_through_relay_and_gateway() {
    let llm = Arc::new(RecordingLlm::default());
    let (base, shutdown) = spawn_gateway(GatewayState::with_provider(llm.clone())).await;
    let relay = connect_backend(&base, RelayOptions::default())
        .await
        .expect("relay");

    let page = PageContext::new(capture());
    page.audit().await.expect("audit");
    let (payload, result) = page
        .ai_analysis(&relay, &AnalysisOptions::default())
        .await
        .expect("analysis");

    assert!(result.success);
    assert!(result.analysis.contains("Solid contrast"));
    let metadata = result.metadata.expect("metadata");
    assert_eq!(metadata.dom_elements_analyzed, payload.dom_styles.len());
    assert_eq!(metadata.url, "https://example.com");
    assert_eq!(llm.prompts.lock().len(), 1);
    shutdown.cancel();
}

struct SlowLlm;

#[async_trait]
impl LlmProvider for SlowLlm {
    async fn complete(&self, _request: LlmRequest) -> astra_lib::Result<String> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("too late".to_string())
    }
}

#[tokio::test]
async fn slow_gateway_surfaces_as_timeout() {
    let (base, shutdown) = spawn_gateway(GatewayState::with_provider(Arc::new(SlowLlm))).await;
    let options = RelayOptions {
        request_timeout: Duration::from_millis(500),
        ..RelayOptions::default()
    };
    let relay = connect_backend(&base, options).await.expect("relay");

    let page = PageContext::new(capture());
    let err = page
        .ai_analysis(&relay, &AnalysisOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Timeout, "unexpected error: {err:?}");
    assert!(!matches!(err, AstraError::Communication(_)));
    shutdown.cancel();
}

#[tokio::test]
async fn unreachable_gateway_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let relay = connect_backend(&format!("http://{addr}"), RelayOptions::default())
        .await
        .expect("relay");
    let err = relay.health_check().await.unwrap_err();
    assert!(
        matches!(err.category(), ErrorCategory::Network | ErrorCategory::Timeout),
        "unexpected error: {err:?}"
    );
    assert!(!matches!(err, AstraError::Config(_)));
}
