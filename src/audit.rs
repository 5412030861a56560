//! Audit Runner: invokes the accessibility engine and hands back its raw
//! result untouched.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{AstraError, Result};
use crate::types::{AuditResult, AxeOutcome, PageCapture};

pub const ENGINE_NOT_LOADED: &str = "axe-core library not loaded";

/// An accessibility rule engine run against one page.
#[async_trait]
pub trait AccessibilityEngine: Send + Sync {
    async fn run(&self) -> Result<AuditResult>;

    fn name(&self) -> &str {
        "axe-core"
    }
}

/// Engine output recorded by the capture helper inside the page.
#[derive(Debug, Clone)]
pub struct CapturedEngine {
    outcome: AxeOutcome,
}

impl CapturedEngine {
    pub fn new(outcome: AxeOutcome) -> Self {
        Self { outcome }
    }

    pub fn from_capture(capture: &PageCapture) -> Self {
        Self::new(capture.axe.clone())
    }
}

#[async_trait]
impl AccessibilityEngine for CapturedEngine {
    async fn run(&self) -> Result<AuditResult> {
        match &self.outcome {
            AxeOutcome::Ok { results } => Ok(serde_json::from_value(results.clone())?),
            AxeOutcome::Unavailable { message } => {
                debug!(%message, "accessibility engine unavailable in captured page");
                Err(AstraError::EngineUnavailable(ENGINE_NOT_LOADED.to_string()))
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct AuditRunner {
    engine: Option<Arc<dyn AccessibilityEngine>>,
}

impl AuditRunner {
    pub fn new(engine: Arc<dyn AccessibilityEngine>) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    pub fn for_capture(capture: &PageCapture) -> Self {
        Self::new(Arc::new(CapturedEngine::from_capture(capture)))
    }

    /// Runs the engine once. The engine's presence is checked at call time.
    pub async fn run_audit(&self) -> Result<AuditResult> {
        let engine = self
            .engine
            .as_ref()
            .ok_or_else(|| AstraError::EngineUnavailable(ENGINE_NOT_LOADED.to_string()))?;

        let start = Instant::now();
        let result = engine.run().await?;
        info!(
            engine = engine.name(),
            violations = result.violations.len(),
            passes = result.passes.len(),
            incomplete = result.incomplete.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "accessibility audit finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use serde_json::json;

    #[tokio::test]
    async fn missing_engine_is_engine_unavailable() {
        let err = AuditRunner::default().run_audit().await.unwrap_err();
        assert!(matches!(err, AstraError::EngineUnavailable(ref m) if m == ENGINE_NOT_LOADED));
        assert_eq!(err.category(), ErrorCategory::Engine);
    }

    #[tokio::test]
    async fn unavailable_capture_is_engine_unavailable() {
        let runner = AuditRunner::new(Arc::new(CapturedEngine::new(AxeOutcome::Unavailable {
            message: "Cannot find module 'axe-core'".into(),
        })));
        assert!(matches!(
            runner.run_audit().await,
            Err(AstraError::EngineUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn captured_results_pass_through() {
        let results = json!({
            "toolOptions": {"reporter": "v1"},
            "passes": [],
            "violations": [{"id": "image-alt", "impact": "critical", "nodes": []}],
            "incomplete": []
        });
        let runner = AuditRunner::new(Arc::new(CapturedEngine::new(AxeOutcome::Ok {
            results: results.clone(),
        })));
        let audit = runner.run_audit().await.expect("audit");
        assert_eq!(audit.violations[0].id, "image-alt");
        assert_eq!(serde_json::to_value(&audit).expect("serialize"), results);
    }
}
