use crate::dom::SelectorError;
use crate::image_loader::ImageLoadError;
use crate::resource::ResourceParseError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::ParseError;

#[derive(Debug, Error)]
pub enum AstraError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Accessibility engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Extension communication error: {0}")]
    Communication(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Payload of {size} bytes exceeds the {limit} byte budget")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("{0} is already running for this page")]
    Busy(String),

    #[error("Invalid selector: {0}")]
    Selector(#[from] SelectorError),

    #[error("Browser capture error: {0}")]
    Browser(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error(transparent)]
    Resource(#[from] ResourceParseError),

    /// An error reported across the relay boundary, keeping its category.
    #[error("{message}")]
    Relayed {
        category: ErrorCategory,
        message: String,
    },
}

impl AstraError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        AstraError::Http {
            status,
            message: message.into(),
        }
    }

    pub fn communication(message: impl Into<String>) -> Self {
        AstraError::Communication(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AstraError::Network(e) if e.is_timeout() => ErrorCategory::Timeout,
            AstraError::Network(_) => ErrorCategory::Network,
            AstraError::Http { status, message } => {
                if mentions_api_key(message) {
                    ErrorCategory::Config
                } else if matches!(status, 408 | 504) {
                    ErrorCategory::Timeout
                } else if *status >= 500 {
                    ErrorCategory::Server
                } else {
                    ErrorCategory::Input
                }
            }
            AstraError::Config(_) => ErrorCategory::Config,
            AstraError::Timeout(_) => ErrorCategory::Timeout,
            AstraError::Communication(_) => ErrorCategory::Communication,
            AstraError::EngineUnavailable(_) => ErrorCategory::Engine,
            AstraError::Busy(_) => ErrorCategory::Busy,
            AstraError::InvalidUrl(_)
            | AstraError::Selector(_)
            | AstraError::PayloadTooLarge { .. }
            | AstraError::ElementNotFound(_)
            | AstraError::Image(_)
            | AstraError::Resource(_) => ErrorCategory::Input,
            AstraError::Browser(_) => ErrorCategory::Browser,
            AstraError::Relayed { category, .. } => *category,
            AstraError::Io(_) | AstraError::Serialization(_) => ErrorCategory::Unknown,
        }
    }

    /// Maps the error onto the panel shown to the user: a category title plus
    /// a troubleshooting list.
    pub fn to_payload(&self) -> ErrorPayload {
        let category = self.category();
        let tips: &[&str] = match category {
            ErrorCategory::Network => &[
                "Check your internet connection",
                "Verify the backend URL is correct (--backend-url or backend_url in config)",
                "Try again in a few moments",
            ],
            ErrorCategory::Server => &[
                "The analysis backend is experiencing issues",
                "Check the gateway logs (RUST_LOG=astra=debug astra serve)",
                "Verify the Anthropic API key is configured on the gateway",
            ],
            ErrorCategory::Timeout => &[
                "The request took too long to process",
                "Try with less data or a simpler page",
                "Increase timeouts.request in the config file",
            ],
            ErrorCategory::Config => &[
                "The Anthropic API key is not configured on the gateway",
                "Set ANTHROPIC_API_KEY (or CLAUDE_API_KEY) before running `astra serve`",
                "Verify the API key has the proper permissions",
            ],
            ErrorCategory::Communication => &[
                "The background service stopped responding",
                "Re-run the command; the page session is recreated on each run",
                "Run with --verbose to see relay diagnostics",
            ],
            ErrorCategory::Engine => &[
                "axe-core is not available in the page",
                "Install it next to Playwright: `npm install axe-core`",
            ],
            ErrorCategory::Browser => &[
                "Install Playwright (`npm install playwright` and `npx playwright install chromium`)",
                "Ensure the node binary is on PATH",
                "Increase --nav-timeout if the page loads slowly",
            ],
            ErrorCategory::Input => &[
                "Check the URL, selector or file passed on the command line",
                "Run with --verbose for details",
            ],
            ErrorCategory::Busy => {
                &["Wait for the running action to finish before starting it again"]
            }
            ErrorCategory::Unknown => &["Re-run with --verbose; file an issue if persistent"],
        };
        ErrorPayload {
            category,
            title: category.title().to_string(),
            message: self.to_string(),
            troubleshooting: tips.iter().map(|t| t.to_string()).collect(),
        }
    }
}

fn mentions_api_key(message: &str) -> bool {
    message.to_ascii_lowercase().contains("api key")
}

impl From<ImageLoadError> for AstraError {
    fn from(err: ImageLoadError) -> Self {
        match err {
            ImageLoadError::NotFound(path) => {
                AstraError::Config(format!("File not found: {}", path))
            }
            other => AstraError::Image(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AstraError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Network,
    Server,
    Timeout,
    Config,
    Communication,
    Engine,
    Browser,
    Input,
    Busy,
    Unknown,
}

impl ErrorCategory {
    pub fn title(self) -> &'static str {
        match self {
            ErrorCategory::Network => "Network Connection Error",
            ErrorCategory::Server => "Server Error",
            ErrorCategory::Timeout => "Request Timeout",
            ErrorCategory::Config => "Configuration Error",
            ErrorCategory::Communication => "Extension Communication Error",
            ErrorCategory::Engine => "Accessibility Audit Failed",
            ErrorCategory::Browser => "Page Capture Failed",
            ErrorCategory::Input => "Invalid Input",
            ErrorCategory::Busy => "Action Already Running",
            ErrorCategory::Unknown => "Unknown Error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub category: ErrorCategory,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub troubleshooting: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_message_on_500_is_a_configuration_error() {
        let err = AstraError::http(500, "Anthropic API key not set");
        let payload = err.to_payload();
        assert_eq!(payload.category, ErrorCategory::Config);
        assert_eq!(payload.title, "Configuration Error");
        assert!(
            payload
                .troubleshooting
                .iter()
                .any(|tip| tip.contains("ANTHROPIC_API_KEY")),
            "expected API key tip, got: {:?}",
            payload.troubleshooting
        );
    }

    #[test]
    fn plain_500_is_a_server_error() {
        let err = AstraError::http(500, "Failed to generate AI analysis");
        assert_eq!(err.category(), ErrorCategory::Server);
    }

    #[test]
    fn gateway_timeout_statuses_are_timeouts() {
        assert_eq!(
            AstraError::http(504, "Gateway Timeout").category(),
            ErrorCategory::Timeout
        );
        let payload = AstraError::http(408, "Request Timeout").to_payload();
        assert_eq!(payload.category, ErrorCategory::Timeout);
        assert_eq!(payload.title, ErrorCategory::Timeout.title());
    }

    #[test]
    fn client_status_is_an_input_error() {
        let err = AstraError::http(413, "Payload Too Large");
        assert_eq!(err.category(), ErrorCategory::Input);
    }

    #[test]
    fn timeout_and_communication_have_distinct_categories() {
        assert_eq!(
            AstraError::Timeout(Duration::from_secs(30)).category(),
            ErrorCategory::Timeout
        );
        assert_eq!(
            AstraError::communication("receiver dropped").category(),
            ErrorCategory::Communication
        );
    }

    #[test]
    fn engine_unavailable_mentions_axe_install() {
        let payload =
            AstraError::EngineUnavailable("axe-core library not loaded".into()).to_payload();
        assert_eq!(payload.category, ErrorCategory::Engine);
        assert!(payload
            .troubleshooting
            .iter()
            .any(|tip| tip.contains("npm install axe-core")));
    }

    #[test]
    fn restricted_page_is_an_input_error() {
        let err: AstraError = crate::resource::parse_url("chrome://settings")
            .unwrap_err()
            .into();
        assert_eq!(err.category(), ErrorCategory::Input);
        assert!(err.to_string().contains("cannot run on"));
    }

    #[test]
    fn payload_serializes_lowercase_category() {
        let payload = AstraError::Busy("AI analysis".into()).to_payload();
        let json = serde_json::to_string(&payload).expect("serialize payload");
        assert!(json.contains("\"category\":\"busy\""));
        assert!(json.contains("\"title\":\"Action Already Running\""));
    }
}
