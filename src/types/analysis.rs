use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audit::AuditResult;
use super::style::StyleRecord;

/// Request body for the analysis endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    #[serde(default)]
    pub dom_styles: Vec<StyleRecord>,
    #[serde(default)]
    pub accessibility_results: Option<AuditResult>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub screenshot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_screenshot: Option<String>,
}

impl AnalysisPayload {
    /// Serialized length in bytes, the quantity the budget applies to.
    pub fn byte_len(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(usize::MAX)
    }
}

/// Successful gateway response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub success: bool,
    pub analysis: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AnalysisMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub dom_elements_analyzed: usize,
    pub accessibility_violations: usize,
    pub url: String,
}

impl AnalysisMetadata {
    pub fn for_payload(payload: &AnalysisPayload) -> Self {
        Self {
            dom_elements_analyzed: payload.dom_styles.len(),
            accessibility_violations: payload
                .accessibility_results
                .as_ref()
                .map(|r| r.violations.len())
                .unwrap_or(0),
            url: payload.url.clone(),
        }
    }
}
