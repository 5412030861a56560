//! Data types shared across the surveyor, audit runner, payload assembler,
//! relay and gateway.
//!
//! - [`dom`] - captured page structure (nodes, boxes, computed styles)
//! - [`style`] - the per-element style records sent for analysis
//! - [`audit`] - accessibility engine results, passed through untouched
//! - [`analysis`] - analysis request payloads and gateway results
//! - [`capture`] - a captured page: DOM, screenshot and engine outcome

pub mod analysis;
pub mod audit;
pub mod capture;
pub mod dom;
pub mod style;

pub use analysis::{AnalysisMetadata, AnalysisPayload, AnalysisResult};
pub use audit::{AffectedNode, AuditResult, Impact, Violation};
pub use capture::{AxeOutcome, PageCapture};
pub use dom::{BoundingBox, ComputedStyle, DomNode, DomSnapshot};
pub use style::{Layout, Rect, Spacing, StyleRecord, Typography, Visuals};
