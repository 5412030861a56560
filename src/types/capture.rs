use serde::{Deserialize, Serialize};

use super::dom::DomSnapshot;
use serde_json::Value;

/// Everything Astra needs from one page: structure, pixels and the
/// accessibility engine's raw output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCapture {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub dom: DomSnapshot,
    /// PNG screenshot as a data URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    #[serde(default)]
    pub axe: AxeOutcome,
}

/// Whether the accessibility engine could run in the captured page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AxeOutcome {
    Ok { results: Value },
    Unavailable { message: String },
}

impl Default for AxeOutcome {
    fn default() -> Self {
        AxeOutcome::Unavailable {
            message: "axe-core library not loaded".to_string(),
        }
    }
}
