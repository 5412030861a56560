//! Messages exchanged between the page side and the background service.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AstraError, ErrorCategory, Result};

/// Request sent to the background service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayRequest {
    pub id: String,
    pub action: String,
    #[serde(default)]
    pub data: Value,
}

/// Reply to exactly one [`RelayRequest`], matched by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl RelayResponse {
    pub fn ok(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
            status: None,
        }
    }

    pub fn failure(id: impl Into<String>, err: &AstraError) -> Self {
        let (message, status) = match err {
            AstraError::Http { status, message } => (message.clone(), Some(*status)),
            other => (other.to_string(), None),
        };
        Self {
            id: id.into(),
            success: false,
            data: None,
            error: Some(message),
            error_kind: Some(err.category()),
            status,
        }
    }

    /// Converts back into a typed result on the calling side.
    pub fn into_result(self) -> Result<Value> {
        if self.success {
            return Ok(self.data.unwrap_or(Value::Null));
        }
        let message = self
            .error
            .unwrap_or_else(|| "Unknown error".to_string());
        Err(match (self.status, self.error_kind) {
            (Some(status), _) => AstraError::http(status, message),
            (None, Some(category)) => AstraError::Relayed { category, message },
            (None, None) => AstraError::Relayed {
                category: ErrorCategory::Unknown,
                message,
            },
        })
    }
}

/// Actions the background service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayAction {
    HealthCheck,
    AiAnalysis,
    AnalyzeDesign,
}

impl RelayAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RelayAction::HealthCheck => "healthCheck",
            RelayAction::AiAnalysis => "aiAnalysis",
            RelayAction::AnalyzeDesign => "analyzeDesign",
        }
    }
}

impl fmt::Display for RelayAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelayAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "healthCheck" => Ok(RelayAction::HealthCheck),
            "aiAnalysis" => Ok(RelayAction::AiAnalysis),
            "analyzeDesign" => Ok(RelayAction::AnalyzeDesign),
            other => Err(format!("Unknown action: {}", other)),
        }
    }
}
