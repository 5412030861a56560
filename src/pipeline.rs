use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{debug, info};

use astra_lib::resource::ResourceParseError;
use astra_lib::{
    is_restricted_url, load_capture, parse_page_source, AstraError, AstraOutput, BrowserManager,
    Config, PageCapture, PageContext, PageSource,
};

use crate::cli::{BrowserArgs, OutputFormat, PageArgs};
use crate::formatting::{render_error, write_output};
use crate::settings::{format_effective_config, resolve_settings, FlagSources, ResolvedSettings};

/// Global flags shared by every command.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub raw_args: Vec<String>,
    pub config_path: Option<PathBuf>,
    pub backend_url: Option<String>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
}

impl Invocation {
    /// Render `err` in the requested format and return the fatal exit code.
    pub fn fail(&self, err: AstraError) -> ExitCode {
        render_error(err, self.format, self.output.clone())
    }

    /// Write `body`, turning a write failure into the fatal exit code.
    pub fn emit(&self, body: &AstraOutput, success: ExitCode) -> ExitCode {
        match write_output(body, self.format, self.output.clone()) {
            Ok(()) => success,
            Err(err) => self.fail(AstraError::Config(format!("Failed to write output: {}", err))),
        }
    }

    /// Load the config file and merge it with the command-line flags.
    pub fn settings(
        &self,
        browser: &BrowserArgs,
        max_elements: Option<usize>,
    ) -> Result<(Config, ResolvedSettings), AstraError> {
        let config = Config::load(self.config_path.as_deref())?;
        let flags = FlagSources::from_args(&self.raw_args);
        let resolved = resolve_settings(
            browser,
            self.backend_url.as_deref(),
            max_elements,
            &config,
            &flags,
        );
        debug!(
            "{}",
            format_effective_config(&resolved, self.config_path.as_deref())
        );
        Ok((config, resolved))
    }
}

/// Capture the page (or load a saved capture) and wrap it in a session.
pub async fn load_page(
    page: &PageArgs,
    settings: &ResolvedSettings,
) -> Result<PageContext, AstraError> {
    let source = match (&page.snapshot, &page.url) {
        (Some(path), _) => parse_page_source(&path.to_string_lossy())?,
        (None, Some(url)) => parse_page_source(url)?,
        (None, None) => {
            return Err(AstraError::Config(
                "A page URL or --snapshot is required".to_string(),
            ))
        }
    };
    let capture = capture_source(&source, settings).await?;
    Ok(PageContext::new(capture))
}

async fn capture_source(
    source: &PageSource,
    settings: &ResolvedSettings,
) -> Result<PageCapture, AstraError> {
    let capture = match source {
        PageSource::Url(url) => {
            info!(%url, "capturing page");
            let manager = BrowserManager::new(settings.browser_options());
            manager.capture(url.as_str()).await?
        }
        PageSource::Snapshot(path) => {
            info!(path = %path.display(), "loading saved capture");
            load_capture(path)?
        }
    };
    if is_restricted_url(&capture.url) {
        return Err(ResourceParseError::Restricted { url: capture.url }.into());
    }
    debug!(
        url = %capture.url,
        nodes = capture.dom.nodes.len(),
        screenshot = capture.screenshot.is_some(),
        "page ready"
    );
    Ok(capture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use astra_lib::{save_capture, AxeOutcome, Viewport};
    use astra_lib::types::{DomNode, DomSnapshot};
    use std::time::Duration;
    use tempfile::tempdir;

    fn settings() -> ResolvedSettings {
        ResolvedSettings {
            viewport: Viewport::default(),
            nav_timeout: Duration::from_secs(30),
            network_idle_timeout: Duration::from_secs(10),
            process_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
            ready_timeout: Duration::from_secs(5),
            backend_url: "http://127.0.0.1:3000".into(),
            max_elements: 200,
        }
    }

    fn browser_args() -> BrowserArgs {
        BrowserArgs {
            viewport: Viewport::default(),
            nav_timeout: 30,
            network_idle_timeout: 10,
            process_timeout: 60,
        }
    }

    fn snapshot_args(path: PathBuf) -> PageArgs {
        PageArgs {
            url: None,
            snapshot: Some(path),
            browser: browser_args(),
        }
    }

    fn write_capture(dir: &std::path::Path, url: &str) -> PathBuf {
        let mut dom = DomSnapshot::new(url);
        dom.push(
            DomNode::new("body", "body").with_rect(0.0, 0.0, 800.0, 600.0),
            None,
        );
        let capture = PageCapture {
            url: url.to_string(),
            title: Some("Home".into()),
            dom,
            screenshot: None,
            axe: AxeOutcome::default(),
        };
        let path = dir.join("page.json");
        save_capture(&capture, &path).unwrap();
        path
    }

    #[tokio::test]
    async fn snapshot_pages_load_without_a_browser() {
        let dir = tempdir().unwrap();
        let path = write_capture(dir.path(), "https://example.com");
        let page = load_page(&snapshot_args(path), &settings()).await.unwrap();
        assert_eq!(page.url(), "https://example.com");
        assert_eq!(page.capture().dom.nodes.len(), 1);
    }

    #[tokio::test]
    async fn restricted_snapshot_is_rejected() {
        let dir = tempdir().unwrap();
        let path = write_capture(dir.path(), "chrome://settings");
        let err = load_page(&snapshot_args(path), &settings())
            .await
            .unwrap_err();
        assert!(matches!(err, AstraError::Resource(ResourceParseError::Restricted { .. })));
    }

    #[tokio::test]
    async fn restricted_url_is_rejected_before_capture() {
        let args = PageArgs {
            url: Some("https://chrome.google.com/webstore".into()),
            snapshot: None,
            browser: browser_args(),
        };
        let err = load_page(&args, &settings()).await.unwrap_err();
        assert!(matches!(err, AstraError::Resource(_)));
    }

    #[test]
    fn settings_reads_explicit_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("astra.toml");
        std::fs::write(&path, "backend_url = \"http://localhost:4000\"\n").unwrap();
        let invocation = Invocation {
            raw_args: vec!["astra".into(), "qa".into()],
            config_path: Some(path),
            backend_url: None,
            format: OutputFormat::Json,
            output: None,
        };
        let (_, resolved) = invocation.settings(&browser_args(), None).unwrap();
        assert_eq!(resolved.backend_url, "http://localhost:4000");
    }
}
