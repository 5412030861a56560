//! Browser manager for coordinating headless page captures.
//!
//! Captures are serialized through a semaphore; each one runs the inline
//! Playwright script in its own `node` process.

use crate::image_loader::{downscale_data_uri, SCREENSHOT_SCALE};
use crate::types::PageCapture;
use crate::{AstraError, Result, Viewport};
use std::fs;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::dom::{convert_raw_capture, ScriptResultWithCapture};
use super::playwright::{
    ensure_node_available, ensure_playwright_available, map_playwright_error,
    map_playwright_status_error, map_spawn_error, mock_capture_path, ScriptError, CAPTURE_SCRIPT,
};

/// Default timeout for page navigation.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for waiting for network idle state.
pub const DEFAULT_NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for the entire Playwright process.
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration options for browser sessions.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// The Node.js command to use (default: "node").
    pub node_command: String,
    /// Viewport dimensions for the browser.
    pub viewport: Viewport,
    /// Whether to run in headless mode.
    pub headless: bool,
    /// Timeout for page navigation.
    pub navigation_timeout: Duration,
    /// Timeout for waiting for network idle state.
    pub network_idle_timeout: Duration,
    /// Timeout for the entire Playwright process.
    pub process_timeout: Duration,
    /// Maximum number of concurrent browser sessions.
    pub max_concurrent_sessions: usize,
    /// Factor applied to the viewport screenshot before it is kept.
    pub screenshot_scale: f32,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            viewport: Viewport::default(),
            headless: true,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            network_idle_timeout: DEFAULT_NETWORK_IDLE_TIMEOUT,
            process_timeout: DEFAULT_PROCESS_TIMEOUT,
            max_concurrent_sessions: 1,
            screenshot_scale: SCREENSHOT_SCALE,
        }
    }
}

/// Manages concurrent browser sessions with semaphore-based limiting.
#[derive(Debug, Clone)]
pub struct BrowserManager {
    options: BrowserOptions,
    semaphore: Arc<Semaphore>,
}

impl BrowserManager {
    /// Creates a new BrowserManager with the given options.
    pub fn new(options: BrowserOptions) -> Self {
        let permits = options.max_concurrent_sessions.max(1);
        Self {
            options,
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Loads `url` in a headless browser and returns its DOM, a scaled
    /// screenshot and the accessibility engine's output.
    ///
    /// When `ASTRA_MOCK_CAPTURE` names a capture JSON, that file is returned
    /// instead and no browser is launched.
    pub async fn capture(&self, url: &str) -> Result<PageCapture> {
        if let Some(path) = mock_capture_path() {
            debug!(path = %path, "using mock capture");
            return load_capture(Path::new(&path));
        }

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| AstraError::Config("Browser manager unavailable".to_string()))?;

        // Fail fast if Node is missing to avoid spawning Playwright unnecessarily.
        ensure_node_available(&self.options.node_command).await?;
        ensure_playwright_available(&self.options.node_command).await?;

        info!(
            url,
            width = self.options.viewport.width,
            height = self.options.viewport.height,
            nav_secs = self.options.navigation_timeout.as_secs(),
            "launching headless browser"
        );
        let start = Instant::now();
        let mut capture = self.run_capture(url).await?;
        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            nodes = capture.dom.nodes.len(),
            "page captured"
        );

        if let Some(shot) = capture.screenshot.take() {
            let (width, height) = self.options.viewport.scaled(self.options.screenshot_scale);
            debug!(width, height, "scaling screenshot");
            capture.screenshot = match downscale_data_uri(&shot, self.options.screenshot_scale) {
                Ok(scaled) => Some(scaled),
                Err(err) => {
                    warn!(error = %err, "could not scale screenshot; keeping original");
                    Some(shot)
                }
            };
        }
        Ok(capture)
    }

    async fn run_capture(&self, url: &str) -> Result<PageCapture> {
        let mut cmd = Command::new(&self.options.node_command);
        cmd.arg("-e")
            .arg(CAPTURE_SCRIPT)
            .arg(url)
            .arg(self.options.viewport.width.to_string())
            .arg(self.options.viewport.height.to_string())
            .arg(self.options.navigation_timeout.as_millis().to_string())
            .arg(self.options.network_idle_timeout.as_millis().to_string())
            .arg(if self.options.headless { "1" } else { "0" })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|err| map_spawn_error(err, &self.options.node_command))?;

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut out) = stdout_pipe {
                let _ = out.read_to_end(&mut buf).await;
            }
            buf
        });

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut err) = stderr_pipe {
                let _ = err.read_to_end(&mut buf).await;
            }
            buf
        });

        let status = match timeout(self.options.process_timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => return Err(AstraError::Io(err)),
            Err(_) => {
                let _ = child.kill().await;
                let _ = child.wait().await;
                warn!(
                    timeout_secs = self.options.process_timeout.as_secs(),
                    "Playwright process killed after exceeding timeout"
                );
                return Err(AstraError::Timeout(self.options.process_timeout));
            }
        };

        let stdout = stdout_task.await.unwrap_or_default();
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(map_playwright_error(status.to_string(), &stderr));
        }

        let stdout = String::from_utf8_lossy(&stdout);
        parse_script_output(&stdout)
    }
}

fn parse_script_output(stdout: &str) -> Result<PageCapture> {
    let trimmed = stdout.trim();
    let result: ScriptResultWithCapture = match serde_json::from_str(trimmed) {
        Ok(result) => result,
        Err(e) => {
            if let Ok(error) = serde_json::from_str::<ScriptError>(trimmed) {
                return Err(map_playwright_status_error(&error.status, error.message));
            }
            return Err(AstraError::Browser(format!(
                "Failed to parse Playwright output: {} - raw: {}",
                e, trimmed
            )));
        }
    };

    if result.status != "ok" {
        if let Ok(error) = serde_json::from_str::<ScriptError>(trimmed) {
            return Err(map_playwright_status_error(&error.status, error.message));
        }
        return Err(AstraError::Browser(format!(
            "Playwright returned non-ok status {}",
            result.status
        )));
    }

    let raw = result.capture.ok_or_else(|| {
        AstraError::Browser("Playwright output did not include a page capture".to_string())
    })?;
    Ok(convert_raw_capture(raw))
}

/// Reads a capture previously written by [`save_capture`].
pub fn load_capture(path: &Path) -> Result<PageCapture> {
    let data = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AstraError::Config(format!("Capture file not found: {}", path.display()))
        } else {
            AstraError::Io(e)
        }
    })?;
    let capture = serde_json::from_str(&data)?;
    Ok(capture)
}

/// Writes `capture` as pretty JSON, creating parent directories.
pub fn save_capture(capture: &PageCapture, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(capture)?;
    fs::write(path, json)?;
    Ok(())
}
