//! Astra Library
//!
//! Audits a web page's accessibility and design quality, and forwards the
//! extracted page data through a thin gateway to an LLM for a written
//! analysis.
//!
//! # Module Overview
//!
//! - [`browser`] - Headless page capture (DOM, screenshot, axe-core results)
//! - [`dom`] - In-memory document, selector engine and HTML fragments
//! - [`survey`] - Page Surveyor: bounded, prioritized style records
//! - [`audit`] - Audit Runner over the accessibility engine
//! - [`remediation`] - Per-rule suggested fixes for flagged elements
//! - [`report`] - Audit reports with current/fixed code examples
//! - [`payload`] - Analysis payload assembly under a byte budget
//! - [`relay`] - Request/response RPC to the background service
//! - [`gateway`] - HTTP gateway in front of the LLM provider
//! - [`design_qa`] - Design-token and component-pattern checks
//! - [`session`] - Per-page cache and in-flight guards
//! - [`workflow`] - User actions against one captured page
//! - [`config`] - Configuration file support
//! - [`output`] - JSON output schemas
//!
//! # Example
//!
//! ```no_run
//! use astra_lib::{connect_backend, BrowserManager, BrowserOptions, PageContext};
//! use astra_lib::{AnalysisOptions, RelayOptions};
//!
//! # async fn example() -> astra_lib::Result<()> {
//! let manager = BrowserManager::new(BrowserOptions::default());
//! let page = PageContext::new(manager.capture("https://example.com").await?);
//!
//! let audit = page.audit().await?;
//! println!("{} violations", audit.violations.len());
//!
//! let relay = connect_backend("http://127.0.0.1:3000", RelayOptions::default()).await?;
//! let (_, result) = page.ai_analysis(&relay, &AnalysisOptions::default()).await?;
//! println!("{}", result.analysis);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod browser;
pub mod config;
pub mod data_uri;
pub mod design_qa;
pub mod dom;
pub mod error;
pub mod gateway;
pub mod image_loader;
pub mod output;
pub mod payload;
pub mod relay;
pub mod remediation;
pub mod report;
pub mod resource;
pub mod session;
pub mod survey;
pub mod types;
pub mod viewport;
pub mod workflow;

pub use audit::{AccessibilityEngine, AuditRunner, CapturedEngine};
pub use browser::{
    load_capture, save_capture, BrowserManager, BrowserOptions, DEFAULT_NAVIGATION_TIMEOUT,
    DEFAULT_NETWORK_IDLE_TIMEOUT, DEFAULT_PROCESS_TIMEOUT,
};
pub use config::Config;
pub use data_uri::DataUri;
pub use design_qa::{QaIssue, QaReport, QaSummary};
pub use dom::{Document, ElementRef};
pub use error::{AstraError, ErrorCategory, ErrorPayload, Result};
pub use gateway::{GatewayConfig, GatewayState};
pub use output::{
    AnalysisKind, AnalysisOutput, AstraOutput, AuditOutput, CaptureOutput, ErrorOutput,
    HealthOutput, PayloadOutput, QaOutput, SurveyOutput, ASTRA_OUTPUT_VERSION,
};
pub use payload::{assemble, enforce_budget, Budget};
pub use relay::{BackendClient, Relay, RelayOptions};
pub use remediation::{element_html, generate_fix};
pub use report::{build_audit_report, AuditReport};
pub use resource::{is_restricted_url, parse_page_source, PageSource};
pub use session::{Session, SessionAction};
pub use survey::{survey, survey_with, SurveyOptions};
pub use types::{
    AnalysisPayload, AnalysisResult, AuditResult, AxeOutcome, Impact, PageCapture, StyleRecord,
    Violation,
};
pub use viewport::Viewport;
pub use workflow::{connect_backend, AnalysisOptions, PageContext};
