//! Payload Assembler: builds analysis request bodies and keeps them under a
//! byte budget by shedding the least essential data first.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{AnalysisPayload, AuditResult, StyleRecord};

/// A serialized-size ceiling plus the element count kept when trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    pub max_bytes: usize,
    pub max_styles: usize,
}

impl Budget {
    /// General AI analysis.
    pub const AI_ANALYSIS: Budget = Budget {
        max_bytes: 1_000_000,
        max_styles: 100,
    };

    /// Design comparison; smaller since it carries a second image.
    pub const DESIGN_ANALYSIS: Budget = Budget {
        max_bytes: 800_000,
        max_styles: 100,
    };
}

pub fn assemble(
    styles: Vec<StyleRecord>,
    audit: Option<AuditResult>,
    url: impl Into<String>,
    screenshot: Option<String>,
) -> AnalysisPayload {
    AnalysisPayload {
        dom_styles: styles,
        accessibility_results: audit,
        url: url.into(),
        screenshot,
        design_screenshot: None,
    }
}

/// Trims `payload` until it fits `budget`, re-measuring after each step:
/// first `domStyles` is cut to `budget.max_styles`, then both screenshots are
/// dropped. A payload still too large after that is returned as is.
pub fn enforce_budget(mut payload: AnalysisPayload, budget: Budget) -> AnalysisPayload {
    let mut size = payload.byte_len();
    if size <= budget.max_bytes {
        return payload;
    }

    if payload.dom_styles.len() > budget.max_styles {
        debug!(
            size,
            limit = budget.max_bytes,
            from = payload.dom_styles.len(),
            to = budget.max_styles,
            "payload over budget, truncating dom styles"
        );
        payload.dom_styles.truncate(budget.max_styles);
        size = payload.byte_len();
        if size <= budget.max_bytes {
            return payload;
        }
    }

    if payload.screenshot.is_some() || payload.design_screenshot.is_some() {
        debug!(size, limit = budget.max_bytes, "payload over budget, dropping screenshots");
        payload.screenshot = None;
        payload.design_screenshot = None;
        size = payload.byte_len();
        if size <= budget.max_bytes {
            return payload;
        }
    }

    warn!(
        size,
        limit = budget.max_bytes,
        "payload still over budget after trimming; sending anyway"
    );
    payload
}
