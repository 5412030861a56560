use std::path::PathBuf;
use std::process::ExitCode;

use tracing::info;

use astra_lib::output::ASTRA_OUTPUT_VERSION;
use astra_lib::resource::parse_url;
use astra_lib::{
    save_capture, AstraOutput, AxeOutcome, BrowserManager, CaptureOutput, QaOutput,
    SurveyOptions, SurveyOutput,
};

use crate::cli::{BrowserArgs, PageArgs};
use crate::pipeline::{load_page, Invocation};

/// Run the design QA command.
pub async fn run_qa(invocation: &Invocation, page: PageArgs) -> ExitCode {
    let (config, settings) = match invocation.settings(&page.browser, None) {
        Ok(resolved) => resolved,
        Err(err) => return invocation.fail(err),
    };
    let context = match load_page(&page, &settings).await {
        Ok(context) => context,
        Err(err) => return invocation.fail(err),
    };
    let report = match context.design_qa(&config.token_config, &config.component_patterns) {
        Ok(report) => report,
        Err(err) => return invocation.fail(err),
    };
    info!(
        issues = report.summary.total,
        elements = report.elements_analyzed,
        "design QA finished"
    );
    let body = QaOutput {
        version: ASTRA_OUTPUT_VERSION.to_string(),
        report,
    };
    invocation.emit(&AstraOutput::DesignQa(body), ExitCode::SUCCESS)
}

/// Run the survey command.
pub async fn run_survey(
    invocation: &Invocation,
    page: PageArgs,
    max_elements: Option<usize>,
) -> ExitCode {
    let (_, settings) = match invocation.settings(&page.browser, max_elements) {
        Ok(resolved) => resolved,
        Err(err) => return invocation.fail(err),
    };
    let context = match load_page(&page, &settings).await {
        Ok(context) => context,
        Err(err) => return invocation.fail(err),
    };
    let records = context.survey(&SurveyOptions {
        max_elements: settings.max_elements,
        ..SurveyOptions::default()
    });
    let body = SurveyOutput {
        version: ASTRA_OUTPUT_VERSION.to_string(),
        url: context.url().to_string(),
        count: records.len(),
        records,
    };
    invocation.emit(&AstraOutput::Survey(body), ExitCode::SUCCESS)
}

/// Run the capture command.
pub async fn run_capture(
    invocation: &Invocation,
    url: String,
    out: PathBuf,
    browser: BrowserArgs,
) -> ExitCode {
    let (_, settings) = match invocation.settings(&browser, None) {
        Ok(resolved) => resolved,
        Err(err) => return invocation.fail(err),
    };
    let url = match parse_url(&url) {
        Ok(url) => url,
        Err(err) => return invocation.fail(err.into()),
    };
    let manager = BrowserManager::new(settings.browser_options());
    let capture = match manager.capture(url.as_str()).await {
        Ok(capture) => capture,
        Err(err) => return invocation.fail(err),
    };
    if let Err(err) = save_capture(&capture, &out) {
        return invocation.fail(err);
    }
    info!(path = %out.display(), "capture saved");

    let engine = match &capture.axe {
        AxeOutcome::Ok { .. } => "ok",
        AxeOutcome::Unavailable { .. } => "unavailable",
    };
    let body = CaptureOutput {
        version: ASTRA_OUTPUT_VERSION.to_string(),
        url: capture.url.clone(),
        title: capture.title.clone(),
        path: out,
        nodes: capture.dom.nodes.len(),
        screenshot: capture.screenshot.is_some(),
        engine: engine.to_string(),
    };
    invocation.emit(&AstraOutput::Capture(body), ExitCode::SUCCESS)
}
