mod cli;
mod commands;
mod formatting;
mod pipeline;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{
    run_analyze, run_audit, run_capture, run_design, run_health, run_qa, run_serve, run_survey,
    AnalyzeArgs, DesignArgs,
};
use pipeline::Invocation;

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

async fn run() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().collect();
    let args = cli::parse();
    init_tracing(args.verbose);

    let invocation = Invocation {
        raw_args,
        config_path: args.config,
        backend_url: args.backend_url,
        format: args.format,
        output: args.output,
    };

    match args.command {
        Commands::Audit { page, fail_on } => run_audit(&invocation, page, fail_on).await,
        Commands::Analyze {
            page,
            no_screenshot,
            no_audit,
            max_elements,
            dry_run,
        } => {
            run_analyze(
                &invocation,
                AnalyzeArgs {
                    page,
                    no_screenshot,
                    no_audit,
                    max_elements,
                    dry_run,
                },
            )
            .await
        }
        Commands::Design {
            page,
            design,
            no_audit,
            dry_run,
        } => {
            run_design(
                &invocation,
                DesignArgs {
                    page,
                    design,
                    no_audit,
                    dry_run,
                },
            )
            .await
        }
        Commands::Qa { page } => run_qa(&invocation, page).await,
        Commands::Survey { page, max_elements } => {
            run_survey(&invocation, page, max_elements).await
        }
        Commands::Capture { url, out, browser } => {
            run_capture(&invocation, url, out, browser).await
        }
        Commands::Health => run_health(&invocation).await,
        Commands::Serve { bind } => run_serve(&invocation, bind).await,
    }
}

/// Logs go to stderr so stdout stays clean for JSON output. `RUST_LOG`
/// overrides the level chosen by `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "astra=debug,astra_lib=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
