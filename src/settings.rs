use std::path::Path;
use std::time::Duration;

use astra_lib::{BrowserOptions, Config, RelayOptions, Viewport};

use crate::cli::BrowserArgs;

/// Tracks which CLI flags were explicitly provided vs. defaulted.
#[derive(Debug, Default)]
pub struct FlagSources {
    pub viewport: bool,
    pub nav_timeout: bool,
    pub network_idle_timeout: bool,
    pub process_timeout: bool,
}

impl FlagSources {
    pub fn from_args(args: &[String]) -> Self {
        Self {
            viewport: flag_present(args, "--viewport"),
            nav_timeout: flag_present(args, "--nav-timeout"),
            network_idle_timeout: flag_present(args, "--network-idle-timeout"),
            process_timeout: flag_present(args, "--process-timeout"),
        }
    }
}

/// Checks if a flag was present in the command-line arguments.
pub fn flag_present(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|arg| arg == flag || arg.starts_with(&format!("{flag}=")))
}

/// Resolved settings after merging CLI args and config file.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub viewport: Viewport,
    pub nav_timeout: Duration,
    pub network_idle_timeout: Duration,
    pub process_timeout: Duration,
    pub request_timeout: Duration,
    pub ready_timeout: Duration,
    pub backend_url: String,
    pub max_elements: usize,
}

impl ResolvedSettings {
    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            viewport: self.viewport,
            navigation_timeout: self.nav_timeout,
            network_idle_timeout: self.network_idle_timeout,
            process_timeout: self.process_timeout,
            ..BrowserOptions::default()
        }
    }

    pub fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            request_timeout: self.request_timeout,
            ready_timeout: self.ready_timeout,
        }
    }
}

/// Merge CLI arguments with config file, preferring CLI when flags are present.
pub fn resolve_settings(
    browser: &BrowserArgs,
    cli_backend_url: Option<&str>,
    cli_max_elements: Option<usize>,
    config: &Config,
    flags: &FlagSources,
) -> ResolvedSettings {
    ResolvedSettings {
        viewport: if flags.viewport {
            browser.viewport
        } else {
            config.viewport
        },
        nav_timeout: if flags.nav_timeout {
            Duration::from_secs(browser.nav_timeout)
        } else {
            config.timeouts.navigation
        },
        network_idle_timeout: if flags.network_idle_timeout {
            Duration::from_secs(browser.network_idle_timeout)
        } else {
            config.timeouts.network_idle
        },
        process_timeout: if flags.process_timeout {
            Duration::from_secs(browser.process_timeout)
        } else {
            config.timeouts.process
        },
        request_timeout: config.timeouts.request,
        ready_timeout: config.timeouts.ready,
        backend_url: cli_backend_url
            .map(str::to_owned)
            .unwrap_or_else(|| config.backend_url.clone()),
        max_elements: cli_max_elements
            .filter(|n| *n > 0)
            .unwrap_or(config.survey.max_elements),
    }
}

/// Format effective config as a single-line string.
pub fn format_effective_config(
    settings: &ResolvedSettings,
    config_source: Option<&Path>,
) -> String {
    let source = config_source
        .map(|p| p.display().to_string())
        .or_else(|| {
            Config::central_config_path()
                .filter(|p| p.is_file())
                .map(|p| p.display().to_string())
        })
        .unwrap_or_else(|| "defaults".to_string());
    format!(
        "Effective config [{source}]: viewport={}x{}, timeouts: nav={}s, network-idle={}s, process={}s, request={}s, ready={}s, backend={}, max_elements={}",
        settings.viewport.width,
        settings.viewport.height,
        settings.nav_timeout.as_secs(),
        settings.network_idle_timeout.as_secs(),
        settings.process_timeout.as_secs(),
        settings.request_timeout.as_secs(),
        settings.ready_timeout.as_secs(),
        settings.backend_url,
        settings.max_elements,
    )
}
