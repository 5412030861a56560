use astra_lib::{Impact, Viewport};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "astra")]
#[command(
    version,
    about = "Astra - Accessibility and design audits with AI analysis",
    long_about = "Astra\n\nAudits a web page's accessibility and design quality and asks an LLM, through the Astra gateway, for a written analysis.\n\nPages are captured headlessly with Playwright (URL argument) or loaded from a saved capture (--snapshot).\n\nModes:\n- audit: axe-core violations with current and suggested markup.\n- analyze: AI analysis of the page's styles, audit and screenshot.\n- design: AI comparison of the page against a design image.\n- qa: design-token and component-pattern checks.\n- survey: the style records sent for analysis.\n- capture: save a page capture as JSON for later runs.\n- health: check the gateway.\n- serve: run the gateway.\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output (debug logging)")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML); defaults to ~/.config/astra/config.toml; CLI flags override config"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "URL",
        help = "Astra gateway base URL (overrides backend_url in config)"
    )]
    pub backend_url: Option<String>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value = "pretty",
        help = "Output format (json or pretty)"
    )]
    pub format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Write output to file instead of stdout"
    )]
    pub output: Option<PathBuf>,
}

/// Where the page comes from.
#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    #[arg(
        value_name = "URL",
        required_unless_present = "snapshot",
        help = "Page to capture (http or https)"
    )]
    pub url: Option<String>,

    #[arg(
        long,
        value_name = "PATH",
        conflicts_with = "url",
        help = "Use a capture saved with `astra capture` instead of launching a browser"
    )]
    pub snapshot: Option<PathBuf>,

    #[command(flatten)]
    pub browser: BrowserArgs,
}

#[derive(Args, Debug, Clone)]
pub struct BrowserArgs {
    #[arg(
        long,
        default_value = "1440x900",
        help = "Viewport dimensions (WIDTHxHEIGHT)"
    )]
    pub viewport: Viewport,

    #[arg(
        long = "nav-timeout",
        default_value_t = 30,
        help = "Navigation timeout in seconds for URL capture"
    )]
    pub nav_timeout: u64,

    #[arg(
        long = "network-idle-timeout",
        default_value_t = 10,
        help = "Network idle wait timeout in seconds for URL capture"
    )]
    pub network_idle_timeout: u64,

    #[arg(
        long = "process-timeout",
        default_value_t = 60,
        help = "Overall Playwright process timeout in seconds"
    )]
    pub process_timeout: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the accessibility audit and show fixes for each violation
    Audit {
        #[command(flatten)]
        page: PageArgs,

        #[arg(
            long,
            value_enum,
            help = "Exit with code 1 when a violation at or above this impact is found"
        )]
        fail_on: Option<ImpactLevel>,
    },

    /// Send the page's styles, audit and screenshot for AI analysis
    Analyze {
        #[command(flatten)]
        page: PageArgs,

        #[arg(long, help = "Do not attach the page screenshot")]
        no_screenshot: bool,

        #[arg(long, help = "Do not run the accessibility audit first")]
        no_audit: bool,

        #[arg(long, help = "Cap on surveyed elements (overrides survey.max_elements)")]
        max_elements: Option<usize>,

        #[arg(long, help = "Print the request payload instead of sending it")]
        dry_run: bool,
    },

    /// Compare the page against a design image with AI analysis
    Design {
        #[command(flatten)]
        page: PageArgs,

        #[arg(long, value_name = "PATH", help = "Design image (png, jpg, jpeg, webp, gif)")]
        design: String,

        #[arg(long, help = "Do not run the accessibility audit first")]
        no_audit: bool,

        #[arg(long, help = "Print the request payload instead of sending it")]
        dry_run: bool,
    },

    /// Check styles against design tokens and components against patterns
    Qa {
        #[command(flatten)]
        page: PageArgs,
    },

    /// List the style records extracted from the page
    Survey {
        #[command(flatten)]
        page: PageArgs,

        #[arg(long, help = "Cap on surveyed elements (overrides survey.max_elements)")]
        max_elements: Option<usize>,
    },

    /// Capture a page and save it as JSON for --snapshot
    Capture {
        #[arg(value_name = "URL", help = "Page to capture (http or https)")]
        url: String,

        #[arg(long, value_name = "PATH", help = "Where to write the capture JSON")]
        out: PathBuf,

        #[command(flatten)]
        browser: BrowserArgs,
    },

    /// Check that the gateway is reachable
    Health,

    /// Run the analysis gateway
    Serve {
        #[arg(
            long,
            value_name = "ADDR",
            help = "Address to listen on (overrides ASTRA_BIND; default 127.0.0.1:3000)"
        )]
        bind: Option<std::net::SocketAddr>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ImpactLevel {
    Minor,
    Moderate,
    Serious,
    Critical,
}

impl From<ImpactLevel> for Impact {
    fn from(level: ImpactLevel) -> Self {
        match level {
            ImpactLevel::Minor => Impact::Minor,
            ImpactLevel::Moderate => Impact::Moderate,
            ImpactLevel::Serious => Impact::Serious,
            ImpactLevel::Critical => Impact::Critical,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
