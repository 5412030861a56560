//! Headless page capture.
//!
//! Loads a page with Playwright via Node.js and returns a [`PageCapture`]:
//! the element tree with computed styles, a viewport screenshot, and the
//! axe-core results when the engine could be injected.
//!
//! - [`manager`] - capture sessions with concurrency control
//! - [`playwright`] - the capture script and availability checks
//! - [`dom`] - raw script output and its conversion
//!
//! # Example
//!
//! ```no_run
//! use astra_lib::{BrowserManager, BrowserOptions};
//!
//! # async fn example() -> astra_lib::Result<()> {
//! let manager = BrowserManager::new(BrowserOptions::default());
//! let capture = manager.capture("https://example.com").await?;
//! println!("{} elements", capture.dom.nodes.len());
//! # Ok(())
//! # }
//! ```
//!
//! [`PageCapture`]: crate::types::PageCapture

mod dom;
mod manager;
mod playwright;

pub use manager::{
    load_capture, save_capture, BrowserManager, BrowserOptions, DEFAULT_NAVIGATION_TIMEOUT,
    DEFAULT_NETWORK_IDLE_TIMEOUT, DEFAULT_PROCESS_TIMEOUT,
};
