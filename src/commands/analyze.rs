use std::process::ExitCode;

use tracing::{info, warn};

use astra_lib::output::ASTRA_OUTPUT_VERSION;
use astra_lib::image_loader::design_image_data_uri;
use astra_lib::resource::parse_design_image;
use astra_lib::{
    connect_backend, AnalysisKind, AnalysisOptions, AnalysisOutput, AstraError, AstraOutput,
    Config, PageContext, PayloadOutput, SurveyOptions,
};

use crate::cli::PageArgs;
use crate::pipeline::{load_page, Invocation};
use crate::settings::ResolvedSettings;

/// Options for the analyze command.
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    pub page: PageArgs,
    pub no_screenshot: bool,
    pub no_audit: bool,
    pub max_elements: Option<usize>,
    pub dry_run: bool,
}

/// Options for the design command.
#[derive(Debug, Clone)]
pub struct DesignArgs {
    pub page: PageArgs,
    pub design: String,
    pub no_audit: bool,
    pub dry_run: bool,
}

/// Run the analyze command.
pub async fn run_analyze(invocation: &Invocation, args: AnalyzeArgs) -> ExitCode {
    let (config, settings) = match prepare(invocation, &args.page, args.max_elements) {
        Ok(resolved) => resolved,
        Err(err) => return invocation.fail(err),
    };
    let context = match load_page(&args.page, &settings).await {
        Ok(context) => context,
        Err(err) => return invocation.fail(err),
    };
    if !args.no_audit {
        if let Err(err) = audit_first(&context).await {
            return invocation.fail(err);
        }
    }

    let options = AnalysisOptions {
        survey: survey_options(&settings),
        budget: config.budgets.ai_analysis,
        include_screenshot: !args.no_screenshot,
    };

    if args.dry_run {
        let payload = context.analysis_payload(&options);
        let body = PayloadOutput {
            version: ASTRA_OUTPUT_VERSION.to_string(),
            kind: AnalysisKind::Ai,
            bytes: payload.byte_len(),
            payload,
        };
        return invocation.emit(&AstraOutput::Payload(body), ExitCode::SUCCESS);
    }

    let relay = match connect_backend(&settings.backend_url, settings.relay_options()).await {
        Ok(relay) => relay,
        Err(err) => return invocation.fail(err),
    };
    let (payload, result) = match context.ai_analysis(&relay, &options).await {
        Ok(outcome) => outcome,
        Err(err) => return invocation.fail(err),
    };
    info!(chars = result.analysis.len(), "analysis received");

    let body = AnalysisOutput {
        version: ASTRA_OUTPUT_VERSION.to_string(),
        kind: AnalysisKind::Ai,
        url: payload.url.clone(),
        payload_bytes: payload.byte_len(),
        result,
    };
    invocation.emit(&AstraOutput::Analysis(body), ExitCode::SUCCESS)
}

/// Run the design command.
pub async fn run_design(invocation: &Invocation, args: DesignArgs) -> ExitCode {
    let (config, settings) = match prepare(invocation, &args.page, None) {
        Ok(resolved) => resolved,
        Err(err) => return invocation.fail(err),
    };
    let design_path = match parse_design_image(&args.design) {
        Ok(path) => path,
        Err(err) => return invocation.fail(err.into()),
    };
    let context = match load_page(&args.page, &settings).await {
        Ok(context) => context,
        Err(err) => return invocation.fail(err),
    };
    if !args.no_audit {
        if let Err(err) = audit_first(&context).await {
            return invocation.fail(err);
        }
    }

    let options = AnalysisOptions {
        survey: survey_options(&settings),
        budget: config.budgets.design_analysis,
        include_screenshot: true,
    };

    if args.dry_run {
        let design = match design_image_data_uri(&design_path) {
            Ok(uri) => uri,
            Err(err) => return invocation.fail(err.into()),
        };
        let payload = context.design_payload(design, &options);
        let body = PayloadOutput {
            version: ASTRA_OUTPUT_VERSION.to_string(),
            kind: AnalysisKind::Design,
            bytes: payload.byte_len(),
            payload,
        };
        return invocation.emit(&AstraOutput::Payload(body), ExitCode::SUCCESS);
    }

    let relay = match connect_backend(&settings.backend_url, settings.relay_options()).await {
        Ok(relay) => relay,
        Err(err) => return invocation.fail(err),
    };
    let (payload, result) = match context
        .design_analysis(&relay, &design_path, &options)
        .await
    {
        Ok(outcome) => outcome,
        Err(err) => return invocation.fail(err),
    };

    let body = AnalysisOutput {
        version: ASTRA_OUTPUT_VERSION.to_string(),
        kind: AnalysisKind::Design,
        url: payload.url.clone(),
        payload_bytes: payload.byte_len(),
        result,
    };
    invocation.emit(&AstraOutput::Analysis(body), ExitCode::SUCCESS)
}

fn prepare(
    invocation: &Invocation,
    page: &PageArgs,
    max_elements: Option<usize>,
) -> Result<(Config, ResolvedSettings), AstraError> {
    let (config, settings) = invocation.settings(&page.browser, max_elements)?;
    if !config.ai_enabled {
        return Err(AstraError::Config(
            "AI analysis is disabled (ai_enabled = false in config)".to_string(),
        ));
    }
    Ok((config, settings))
}

/// Runs the audit so its result rides along in the payload. A page without
/// the engine is still analyzed, with accessibility results left empty.
async fn audit_first(context: &PageContext) -> Result<(), AstraError> {
    match context.audit().await {
        Ok(_) => Ok(()),
        Err(AstraError::EngineUnavailable(message)) => {
            warn!(%message, "accessibility engine unavailable; analyzing without audit results");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

fn survey_options(settings: &ResolvedSettings) -> SurveyOptions {
    SurveyOptions {
        max_elements: settings.max_elements,
        ..SurveyOptions::default()
    }
}
