//! Playwright integration for headless page capture.
//!
//! This module contains the inline capture script, error mapping,
//! and availability checks for Node.js and Playwright.

use crate::{AstraError, Result};
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Capture script: navigates, extracts every element with its computed
/// styles, screenshots the viewport, and runs axe-core when the npm package
/// can be resolved. Prints one JSON object on stdout.
pub(crate) const CAPTURE_SCRIPT: &str = r#"
const [, url, width, height, navTimeout, idleTimeout, headlessFlag] = process.argv;

async function runAxe(page) {
  let axePath = null;
  try {
    axePath = require.resolve('axe-core/axe.min.js');
  } catch (e) {
    return { status: 'unavailable', message: 'axe-core library not loaded' };
  }
  try {
    await page.addScriptTag({ path: axePath });
    const results = await page.evaluate(async () => {
      const r = await window.axe.run(document);
      return {
        passes: r.passes,
        violations: r.violations,
        incomplete: r.incomplete,
        inapplicable: r.inapplicable,
        testEngine: r.testEngine,
        url: r.url,
        timestamp: r.timestamp
      };
    });
    return { status: 'ok', results };
  } catch (err) {
    const message = err && err.message ? err.message : String(err);
    return { status: 'unavailable', message: 'axe-core failed to run: ' + message };
  }
}

async function run() {
  let browser;
  try {
    const { chromium } = require('playwright');
    browser = await chromium.launch({ headless: headlessFlag !== '0' });
    const context = await browser.newContext({
      viewport: {
        width: parseInt(width, 10),
        height: parseInt(height, 10)
      }
    });
    const page = await context.newPage();
    const navMs = parseInt(navTimeout, 10);
    const idleMs = parseInt(idleTimeout, 10);

    await page.goto(url, { waitUntil: 'networkidle', timeout: navMs });
    await page.waitForLoadState('networkidle', { timeout: idleMs });

    const dom = await page.evaluate(() => {
      const nodes = [];
      let nodeId = 0;

      function styleOf(el) {
        const s = window.getComputedStyle(el);
        return {
          fontSize: s.fontSize || null,
          fontWeight: s.fontWeight || null,
          fontFamily: s.fontFamily || null,
          lineHeight: s.lineHeight || null,
          color: s.color || null,
          backgroundColor: s.backgroundColor || null,
          margin: s.margin || null,
          padding: s.padding || null,
          borderColor: s.borderColor || null,
          borderRadius: s.borderRadius || null,
          display: s.display || null,
          position: s.position || null,
          visibility: s.visibility || null,
          opacity: s.opacity || null
        };
      }

      function traverse(el, parentId) {
        const id = `node-${nodeId++}`;
        const rect = el.getBoundingClientRect();

        const attributes = {};
        for (const attr of el.attributes) {
          attributes[attr.name] = attr.value;
        }

        let text = null;
        for (const child of el.childNodes) {
          if (child.nodeType === Node.TEXT_NODE) {
            const trimmed = child.textContent.trim();
            if (trimmed) {
              text = text ? text + ' ' + trimmed : trimmed;
            }
          }
        }

        const node = {
          id,
          tag: el.tagName.toLowerCase(),
          children: [],
          parent: parentId,
          attributes,
          text,
          boundingBox: {
            x: rect.left + window.scrollX,
            y: rect.top + window.scrollY,
            width: rect.width,
            height: rect.height
          },
          computedStyle: styleOf(el)
        };
        nodes.push(node);

        for (const child of el.children) {
          node.children.push(traverse(child, id));
        }
        return id;
      }

      traverse(document.documentElement, null);
      return { url: window.location.href, title: document.title, nodes };
    });

    const png = await page.screenshot({ fullPage: false, type: 'png' });
    const screenshot = 'data:image/png;base64,' + png.toString('base64');
    const axe = await runAxe(page);

    console.log(JSON.stringify({
      status: 'ok',
      capture: { url: dom.url, title: dom.title, dom, screenshot, axe }
    }));
  } catch (err) {
    const message = err && err.message ? err.message : String(err);
    console.error(JSON.stringify({ status: 'error', message }));
    process.exitCode = 1;
  } finally {
    if (browser) {
      await browser.close();
    }
  }
}

run();
"#;

/// Timeout for checking node/playwright availability.
pub(crate) const NODE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Script to check if Playwright is installed.
const PLAYWRIGHT_CHECK_SCRIPT: &str = "require('playwright'); process.stdout.write('ok');";

/// Error result from the capture script.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ScriptError {
    pub status: String,
    pub message: String,
}

/// Maps a spawn error to an appropriate AstraError.
pub(crate) fn map_spawn_error(err: io::Error, command: &str) -> AstraError {
    if err.kind() == io::ErrorKind::NotFound {
        AstraError::Browser(format!(
            "Unable to spawn Playwright helper; '{}' was not found on PATH",
            command
        ))
    } else {
        AstraError::Io(err)
    }
}

/// Maps Playwright stderr output to an appropriate AstraError.
pub(crate) fn map_playwright_error(status_text: impl Into<String>, stderr: &str) -> AstraError {
    if let Ok(error) = serde_json::from_str::<ScriptError>(stderr.trim()) {
        return map_playwright_status_error(&error.status, error.message);
    }

    let lower = stderr.to_ascii_lowercase();

    if lower.contains("cannot find module 'playwright'") {
        return AstraError::Browser(
            "Playwright npm package is missing; install with `npm install playwright`.".to_string(),
        );
    }

    if lower.contains("timeout") {
        return AstraError::Browser(
            "Playwright timed out; try increasing --nav-timeout or --process-timeout, and ensure the page finishes loading."
                .to_string(),
        );
    }

    AstraError::Browser(format!(
        "Playwright exited with status {}: {}",
        status_text.into(),
        stderr.trim()
    ))
}

/// Maps a Playwright status error to an appropriate AstraError.
pub(crate) fn map_playwright_status_error(status: &str, message: String) -> AstraError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("cannot find module 'playwright'") {
        AstraError::Browser(
            "Playwright npm package is missing; install with `npm install playwright`.".to_string(),
        )
    } else if lower.contains("timeout") {
        AstraError::Browser(format!(
            "Playwright error (status {}): {}. Hint: increase --nav-timeout or --process-timeout, and ensure the page finishes loading.",
            status, message
        ))
    } else {
        AstraError::Browser(format!("Playwright error (status {}): {}", status, message))
    }
}

/// Path of a capture JSON to use instead of launching a browser.
pub(crate) fn mock_capture_path() -> Option<String> {
    std::env::var("ASTRA_MOCK_CAPTURE")
        .ok()
        .filter(|path| !path.trim().is_empty())
}

/// Ensures Node.js is available on the system.
pub(crate) async fn ensure_node_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.status())
        .await
        .map_err(|_| {
            AstraError::Browser(format!(
                "Timed out checking node availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !status.success() {
        return Err(AstraError::Browser(format!(
            "Node command {:?} is not available (exit {})",
            node_command, status
        )));
    }

    Ok(())
}

/// Ensures the Playwright npm package is installed.
pub(crate) async fn ensure_playwright_available(node_command: &str) -> Result<()> {
    let mut cmd = Command::new(node_command);
    cmd.arg("-e")
        .arg(PLAYWRIGHT_CHECK_SCRIPT)
        .stdout(Stdio::null())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(NODE_CHECK_TIMEOUT, cmd.output())
        .await
        .map_err(|_| {
            AstraError::Browser(format!(
                "Timed out checking Playwright availability after {:?}",
                NODE_CHECK_TIMEOUT
            ))
        })?
        .map_err(|err| map_spawn_error(err, node_command))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(map_playwright_error(
            format!("{:?}", output.status),
            &stderr,
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_playwright_error_detects_missing_module() {
        let err = map_playwright_error(
            "1",
            r#"{"status":"error","message":"Cannot find module 'playwright'"}"#,
        );
        match err {
            AstraError::Browser(msg) => {
                assert!(
                    msg.contains("Playwright npm package is missing"),
                    "expected missing playwright hint, got: {msg}"
                );
            }
            other => panic!("expected browser error, got {other:?}"),
        }
    }

    #[test]
    fn map_playwright_error_handles_non_json_missing_module() {
        let err = map_playwright_error(
            "exit status: 1",
            "Error: Cannot find module 'playwright'\n    at Module._resolveFilename",
        );
        assert!(err.to_string().contains("npm install playwright"));
    }

    #[test]
    fn map_playwright_status_error_includes_timeout_hint() {
        let err =
            map_playwright_status_error("error", "Timeout 30000ms exceeded navigating".to_string());
        let msg = err.to_string();
        assert!(msg.contains("--nav-timeout"), "expected CLI hint, got: {msg}");
        assert_eq!(err.category(), crate::ErrorCategory::Browser);
    }

    #[test]
    fn script_error_preserves_other_messages() {
        let err = map_playwright_error(
            "exit status: 1",
            r#"{"status":"error","message":"net::ERR_NAME_NOT_RESOLVED at https://nope.invalid"}"#,
        );
        let msg = err.to_string();
        assert!(msg.contains("Playwright error"));
        assert!(msg.contains("ERR_NAME_NOT_RESOLVED"));
    }

    #[test]
    fn missing_node_binary_is_a_browser_error() {
        let err = map_spawn_error(io::Error::from(io::ErrorKind::NotFound), "nodez");
        assert!(matches!(err, AstraError::Browser(ref m) if m.contains("'nodez'")));
    }

    #[tokio::test]
    async fn ensure_node_available_fails_for_missing_binary() {
        let result = ensure_node_available("definitely-not-a-binary").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn ensure_playwright_available_fails_for_missing_binary() {
        let result = ensure_playwright_available("definitely-not-a-binary").await;
        assert!(result.is_err());
    }
}
