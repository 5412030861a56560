use std::process::ExitCode;

use tracing::info;

use astra_lib::output::ASTRA_OUTPUT_VERSION;
use astra_lib::{AstraOutput, AuditOutput, Impact};

use crate::cli::{ImpactLevel, PageArgs};
use crate::formatting::exit_code_for_audit;
use crate::pipeline::{load_page, Invocation};

/// Run the audit command.
pub async fn run_audit(
    invocation: &Invocation,
    page: PageArgs,
    fail_on: Option<ImpactLevel>,
) -> ExitCode {
    let (_, settings) = match invocation.settings(&page.browser, None) {
        Ok(resolved) => resolved,
        Err(err) => return invocation.fail(err),
    };
    let context = match load_page(&page, &settings).await {
        Ok(context) => context,
        Err(err) => return invocation.fail(err),
    };
    let audit = match context.audit().await {
        Ok(audit) => audit,
        Err(err) => return invocation.fail(err),
    };

    let report = context.audit_report(&audit);
    let threshold = fail_on.map(Impact::from);
    let failing = threshold
        .map(|t| report.violations_at_or_above(t))
        .unwrap_or(0);
    info!(
        violations = report.counts.violations,
        passes = report.counts.passes,
        failing,
        "audit finished"
    );

    let body = AuditOutput {
        version: ASTRA_OUTPUT_VERSION.to_string(),
        report,
        fail_on: threshold,
        failing,
    };
    let code = exit_code_for_audit(body.passed());
    invocation.emit(&AstraOutput::Audit(body), code)
}
