use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use astra_lib::output::ASTRA_OUTPUT_VERSION;
use astra_lib::report::ViolationReport;
use astra_lib::{AnalysisKind, AstraError, AstraOutput, ErrorOutput};

use crate::cli::OutputFormat;

/// Write output in the requested format.
pub fn write_output(
    body: &AstraOutput,
    format: OutputFormat,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => write_json_output(body, output.as_deref())?,
        OutputFormat::Pretty => write_pretty_output(body, output.as_deref())?,
    };
    Ok(())
}

/// Render an error and return the appropriate exit code.
pub fn render_error(err: AstraError, format: OutputFormat, output: Option<PathBuf>) -> ExitCode {
    tracing::debug!(error = ?err, "command failed");
    let error_payload = err.to_payload();
    let payload = AstraOutput::Error(ErrorOutput {
        version: ASTRA_OUTPUT_VERSION.to_string(),
        message: Some(error_payload.message.clone()),
        error: error_payload,
    });

    match format {
        OutputFormat::Json => {
            let content =
                serde_json::to_string(&payload).unwrap_or_else(|_| "{\"mode\":\"error\"}".into());
            if let Some(path) = output {
                if let Err(write_err) = std::fs::write(&path, &content) {
                    eprintln!("Failed to write error output: {}", write_err);
                    println!("{content}");
                }
            } else {
                println!("{content}");
            }
        }
        OutputFormat::Pretty => {
            if let Err(write_err) = write_pretty_output(&payload, output.as_deref()) {
                eprintln!("Failed to write error output: {}", write_err);
            }
        }
    };

    // Reserve exit code 2 for fatal/errors; threshold failures use 1.
    ExitCode::from(2)
}

/// Write JSON output to file or stdout.
fn write_json_output(
    body: &AstraOutput,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string(body)?;
    if let Some(path) = output {
        std::fs::write(path, content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Write pretty output to file or stdout.
fn write_pretty_output(body: &AstraOutput, output: Option<&Path>) -> io::Result<()> {
    let stdout_is_tty = std::io::stdout().is_terminal();
    let use_human = output.is_none() && stdout_is_tty;

    if use_human {
        let content = format_pretty(body, true);
        println!("{content}");
        return Ok(());
    }

    // Non-tty or file output: keep JSON shape for pipelines/files.
    let content =
        serde_json::to_string_pretty(body).unwrap_or_else(|_| "{\"mode\":\"error\"}".to_string());
    if let Some(path) = output {
        std::fs::write(path, &content)?;
    } else {
        println!("{content}");
    }
    Ok(())
}

/// Format output for human consumption in a terminal.
pub fn format_pretty(body: &AstraOutput, colorize: bool) -> String {
    let mut buf = String::new();
    match body {
        AstraOutput::Audit(out) => {
            let report = &out.report;
            let status = if out.passed() { "PASS" } else { "FAIL" };
            let status_colored = color(status, if out.passed() { "32" } else { "31" }, colorize);
            writeln!(buf, "{} Accessibility audit: {}", status_colored, report.url).ok();
            writeln!(
                buf,
                "Violations: {}  Passes: {}  Incomplete: {}",
                report.counts.violations, report.counts.passes, report.counts.incomplete
            )
            .ok();
            if let Some(threshold) = out.fail_on {
                writeln!(buf, "At or above {}: {}", threshold, out.failing).ok();
            }
            if report.violations.is_empty() {
                writeln!(buf, "No accessibility violations found.").ok();
            }
            for violation in &report.violations {
                write_violation(&mut buf, violation, colorize);
            }
        }
        AstraOutput::Analysis(out) => {
            let label = match out.kind {
                AnalysisKind::Ai => "[AI ANALYSIS]",
                AnalysisKind::Design => "[DESIGN ANALYSIS]",
            };
            writeln!(buf, "{} {}", color(label, "35", colorize), out.url).ok();
            writeln!(
                buf,
                "Generated {} (payload {} KB)",
                out.result.timestamp.to_rfc3339(),
                out.payload_bytes / 1024
            )
            .ok();
            if let Some(meta) = &out.result.metadata {
                writeln!(
                    buf,
                    "Elements analyzed: {}  Accessibility violations: {}",
                    meta.dom_elements_analyzed, meta.accessibility_violations
                )
                .ok();
            }
            writeln!(buf).ok();
            writeln!(buf, "{}", out.result.analysis.trim_end()).ok();
        }
        AstraOutput::Payload(out) => {
            let label = match out.kind {
                AnalysisKind::Ai => "AI analysis",
                AnalysisKind::Design => "design analysis",
            };
            let header = color("[PAYLOAD]", "36", colorize);
            writeln!(
                buf,
                "{} {} request for {} ({} KB, not sent)",
                header,
                label,
                out.payload.url,
                out.bytes / 1024
            )
            .ok();
            writeln!(
                buf,
                "Styles: {}  Audit: {}  Screenshot: {}  Design image: {}",
                out.payload.dom_styles.len(),
                yes_no(out.payload.accessibility_results.is_some()),
                yes_no(out.payload.screenshot.is_some()),
                yes_no(out.payload.design_screenshot.is_some()),
            )
            .ok();
        }
        AstraOutput::DesignQa(out) => {
            let report = &out.report;
            let header = color("[QA]", "34", colorize);
            writeln!(
                buf,
                "{} {} issues across {} elements",
                header, report.summary.total, report.elements_analyzed
            )
            .ok();
            for (severity, count) in report.summary.by_severity.iter().rev() {
                writeln!(buf, "- {:8} {}", severity, count).ok();
            }
            for issue in &report.issues {
                let tag = format!("[{}]", issue.severity);
                writeln!(
                    buf,
                    "{} {}/{} {}: {}",
                    color(&tag, severity_color_code(&issue.severity.to_string()), colorize),
                    issue.issue_type,
                    issue.subtype,
                    issue.selector,
                    issue.message
                )
                .ok();
                writeln!(buf, "    Fix: {}", issue.fix).ok();
            }
        }
        AstraOutput::Survey(out) => {
            let header = color("[SURVEY]", "36", colorize);
            writeln!(buf, "{} {}: {} elements", header, out.url, out.count).ok();
            for record in &out.records {
                let mut name = record.tag_name.clone();
                if let Some(id) = &record.id {
                    write!(name, "#{}", id).ok();
                }
                if !record.class_name.is_empty() {
                    let classes: Vec<&str> = record.class_name.split_whitespace().collect();
                    write!(name, ".{}", classes.join(".")).ok();
                }
                writeln!(
                    buf,
                    "- {:40} {}x{} {} {}",
                    name,
                    record.rect.width,
                    record.rect.height,
                    record.typography.font_size,
                    record.typography.color
                )
                .ok();
            }
        }
        AstraOutput::Capture(out) => {
            let header = color("[CAPTURE]", "32", colorize);
            writeln!(buf, "{} {} -> {}", header, out.url, out.path.display()).ok();
            if let Some(title) = &out.title {
                writeln!(buf, "Title: {}", title).ok();
            }
            writeln!(
                buf,
                "Elements: {}  Screenshot: {}  axe-core: {}",
                out.nodes,
                yes_no(out.screenshot),
                out.engine
            )
            .ok();
        }
        AstraOutput::Health(out) => {
            let header = color("[HEALTH]", "32", colorize);
            let status = out
                .response
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            let service = out
                .response
                .get("service")
                .and_then(|v| v.as_str())
                .unwrap_or("gateway");
            writeln!(buf, "{} {} at {}: {}", header, service, out.backend_url, status).ok();
        }
        AstraOutput::Error(out) => {
            let header = color("[ERROR]", "31", colorize);
            writeln!(buf, "{} {}", header, out.error.title).ok();
            let message = out
                .message
                .as_deref()
                .unwrap_or(out.error.message.as_str());
            writeln!(buf, "{}", message).ok();
            if !out.error.troubleshooting.is_empty() {
                writeln!(buf, "Troubleshooting:").ok();
                for tip in &out.error.troubleshooting {
                    writeln!(buf, "- {}", tip).ok();
                }
            }
        }
    }
    buf
}

fn write_violation(buf: &mut String, violation: &ViolationReport, colorize: bool) {
    let impact = violation
        .impact
        .map(|i| i.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let tag = format!("[{}]", impact);
    let summary = if violation.help.is_empty() {
        &violation.description
    } else {
        &violation.help
    };
    writeln!(
        buf,
        "\n{} {}: {}",
        color(&tag, severity_color_code(&impact), colorize),
        violation.id,
        summary
    )
    .ok();
    writeln!(buf, "  Affected elements: {}", violation.affected).ok();
    if !violation.help_url.is_empty() {
        writeln!(buf, "  Learn more: {}", violation.help_url).ok();
    }
    for (i, example) in violation.examples.iter().enumerate() {
        let target = example.selector.as_deref().unwrap_or("(no selector)");
        writeln!(buf, "  Example {}: {}", i + 1, target).ok();
        if !example.available {
            writeln!(buf, "    Example unavailable (element not found)").ok();
            continue;
        }
        writeln!(buf, "    Current: {}", example.current_code).ok();
        writeln!(buf, "    Fixed:   {}", example.fixed_code).ok();
    }
    if violation.more > 0 {
        writeln!(buf, "  ... and {} more similar issues", violation.more).ok();
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Apply ANSI color codes when enabled.
fn color(text: &str, code: &str, colorize: bool) -> String {
    if colorize {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    } else {
        text.to_string()
    }
}

/// Map a severity or impact name to an ANSI color code.
fn severity_color_code(severity: &str) -> &'static str {
    match severity {
        "critical" | "serious" | "high" => "31", // red
        "moderate" | "medium" => "33",          // yellow
        _ => "36",                              // cyan
    }
}

/// Determine exit code for the audit command.
pub fn exit_code_for_audit(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
