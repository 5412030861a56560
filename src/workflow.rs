//! User actions against one captured page.
//!
//! A [`PageContext`] owns the capture, its [`Document`] and the [`Session`]
//! cache. Each action claims its session guard for its whole duration, so
//! a second identical action fails with `Busy` instead of overlapping.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::audit::AuditRunner;
use crate::design_qa::{self, ComponentPatterns, QaReport, TokenConfig};
use crate::dom::Document;
use crate::error::Result;
use crate::image_loader::design_image_data_uri;
use crate::payload::{assemble, enforce_budget, Budget};
use crate::relay::{BackendClient, Relay, RelayOptions};
use crate::report::{build_audit_report, AuditReport};
use crate::session::{Session, SessionAction};
use crate::survey::SurveyOptions;
use crate::types::{AnalysisPayload, AnalysisResult, AuditResult, PageCapture, StyleRecord};

#[derive(Debug)]
pub struct PageContext {
    capture: PageCapture,
    document: Document,
    session: Session,
}

/// Knobs shared by the analysis actions.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub survey: SurveyOptions,
    pub budget: Budget,
    /// Attach the page screenshot when the capture has one.
    pub include_screenshot: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            survey: SurveyOptions::default(),
            budget: Budget::AI_ANALYSIS,
            include_screenshot: true,
        }
    }
}

impl PageContext {
    pub fn new(capture: PageCapture) -> Self {
        let document = Document::from_snapshot(capture.dom.clone());
        let session = Session::new(capture.url.clone());
        session.set_screenshot(capture.screenshot.clone());
        Self {
            capture,
            document,
            session,
        }
    }

    pub fn url(&self) -> &str {
        &self.capture.url
    }

    pub fn capture(&self) -> &PageCapture {
        &self.capture
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs the accessibility engine and caches its result in the session.
    pub async fn audit(&self) -> Result<AuditResult> {
        let _guard = self.session.begin(SessionAction::Audit)?;
        let result = AuditRunner::for_capture(&self.capture).run_audit().await?;
        self.session.set_audit(result.clone());
        Ok(result)
    }

    pub fn audit_report(&self, audit: &AuditResult) -> AuditReport {
        build_audit_report(&self.document, self.url(), audit)
    }

    /// The style survey, computed once per session.
    pub fn survey(&self, options: &SurveyOptions) -> Vec<StyleRecord> {
        self.session.survey_or_run(&self.document, options)
    }

    pub fn design_qa(
        &self,
        tokens: &TokenConfig,
        patterns: &ComponentPatterns,
    ) -> Result<QaReport> {
        let _guard = self.session.begin(SessionAction::DesignQa)?;
        let mut report = design_qa::analyze(&self.document, tokens, patterns);
        if report.url.is_empty() {
            report.url = self.url().to_string();
        }
        Ok(report)
    }

    /// Request body for a general analysis, already within `options.budget`.
    pub fn analysis_payload(&self, options: &AnalysisOptions) -> AnalysisPayload {
        let styles = self.survey(&options.survey);
        let screenshot = options
            .include_screenshot
            .then(|| self.session.screenshot())
            .flatten();
        let payload = assemble(styles, self.session.audit(), self.url(), screenshot);
        enforce_budget(payload, options.budget)
    }

    /// Request body for a design comparison, already within `options.budget`.
    pub fn design_payload(
        &self,
        design_screenshot: String,
        options: &AnalysisOptions,
    ) -> AnalysisPayload {
        let styles = self.survey(&options.survey);
        let mut payload = assemble(
            styles,
            self.session.audit(),
            self.url(),
            self.session.screenshot(),
        );
        payload.design_screenshot = Some(design_screenshot);
        enforce_budget(payload, options.budget)
    }

    pub async fn ai_analysis(
        &self,
        relay: &Relay,
        options: &AnalysisOptions,
    ) -> Result<(AnalysisPayload, AnalysisResult)> {
        let _guard = self.session.begin(SessionAction::AiAnalysis)?;
        let payload = self.analysis_payload(options);
        info!(
            url = %payload.url,
            kb = payload.byte_len() / 1024,
            styles = payload.dom_styles.len(),
            "requesting AI analysis"
        );
        let result = relay.ai_analysis(&payload).await?;
        Ok((payload, result))
    }

    pub async fn design_analysis(
        &self,
        relay: &Relay,
        design_image: &Path,
        options: &AnalysisOptions,
    ) -> Result<(AnalysisPayload, AnalysisResult)> {
        let _guard = self.session.begin(SessionAction::DesignAnalysis)?;
        let design = design_image_data_uri(design_image)?;
        debug!(path = %design_image.display(), "design image loaded");
        let payload = self.design_payload(design, options);
        info!(
            url = %payload.url,
            kb = payload.byte_len() / 1024,
            "requesting design analysis"
        );
        let result = relay.analyze_design(&payload).await?;
        Ok((payload, result))
    }
}

/// Starts the background service for `backend_url` and returns a relay
/// connected to it.
///
/// `options.request_timeout` bounds each HTTP call. The relay itself waits
/// [`TRANSPORT_MARGIN`](crate::relay::TRANSPORT_MARGIN) longer, so an expired
/// call surfaces as a Timeout.
pub async fn connect_backend(backend_url: &str, options: RelayOptions) -> Result<Relay> {
    let client = BackendClient::with_timeout(backend_url, options.request_timeout)?;
    debug!(backend = %client.base_url(), "starting background service");
    Relay::spawn(Arc::new(client), options.over_transport()).await
}
