use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::design_qa::QaReport;
use crate::error::ErrorPayload;
use crate::report::AuditReport;
use crate::types::{AnalysisPayload, AnalysisResult, Impact, StyleRecord};

/// Schema version for output payloads.
pub const ASTRA_OUTPUT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum AstraOutput {
    Audit(AuditOutput),
    Analysis(AnalysisOutput),
    Payload(PayloadOutput),
    DesignQa(QaOutput),
    Survey(SurveyOutput),
    Capture(CaptureOutput),
    Health(HealthOutput),
    Error(ErrorOutput),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditOutput {
    pub version: String,
    pub report: AuditReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_on: Option<Impact>,
    /// Violations at or above `fail_on`; zero when no threshold is set.
    pub failing: usize,
}

impl AuditOutput {
    pub fn passed(&self) -> bool {
        self.failing == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Ai,
    Design,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutput {
    pub version: String,
    pub kind: AnalysisKind,
    pub url: String,
    /// Serialized request size after the budget was applied.
    pub payload_bytes: usize,
    pub result: AnalysisResult,
}

/// A request body that was built but not sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadOutput {
    pub version: String,
    pub kind: AnalysisKind,
    pub bytes: usize,
    pub payload: AnalysisPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaOutput {
    pub version: String,
    pub report: QaReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyOutput {
    pub version: String,
    pub url: String,
    pub count: usize,
    pub records: Vec<StyleRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOutput {
    pub version: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub path: PathBuf,
    pub nodes: usize,
    pub screenshot: bool,
    /// "ok" or "unavailable".
    pub engine: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthOutput {
    pub version: String,
    pub backend_url: String,
    pub response: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorOutput {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: ErrorPayload,
}
