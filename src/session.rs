//! Per-page session: the cached survey, audit result and screenshot for one
//! page, plus guards that keep each action to a single run at a time.

use std::collections::HashSet;
use std::fmt;

use parking_lot::Mutex;
use tracing::debug;

use crate::dom::Document;
use crate::error::{AstraError, Result};
use crate::survey::{survey_with, SurveyOptions};
use crate::types::{AuditResult, StyleRecord};

/// User-triggered actions that may not overlap with themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionAction {
    Audit,
    AiAnalysis,
    DesignAnalysis,
    DesignQa,
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionAction::Audit => "Accessibility audit",
            SessionAction::AiAnalysis => "AI analysis",
            SessionAction::DesignAnalysis => "Design analysis",
            SessionAction::DesignQa => "Design QA",
        })
    }
}

#[derive(Debug, Default)]
struct SessionState {
    url: String,
    survey: Option<Vec<StyleRecord>>,
    audit: Option<AuditResult>,
    screenshot: Option<String>,
}

#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<SessionState>,
    in_flight: Mutex<HashSet<SessionAction>>,
}

/// Marks an action as running until dropped.
#[derive(Debug)]
#[must_use = "the action is released as soon as the guard is dropped"]
pub struct ActionGuard<'a> {
    session: &'a Session,
    action: SessionAction,
}

impl Drop for ActionGuard<'_> {
    fn drop(&mut self) {
        self.session.in_flight.lock().remove(&self.action);
    }
}

impl Session {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(SessionState {
                url: url.into(),
                ..SessionState::default()
            }),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn url(&self) -> String {
        self.state.lock().url.clone()
    }

    /// Claims `action`, failing with `Busy` if it is already running.
    pub fn begin(&self, action: SessionAction) -> Result<ActionGuard<'_>> {
        if !self.in_flight.lock().insert(action) {
            return Err(AstraError::Busy(action.to_string()));
        }
        debug!(%action, "action started");
        Ok(ActionGuard {
            session: self,
            action,
        })
    }

    pub fn is_running(&self, action: SessionAction) -> bool {
        self.in_flight.lock().contains(&action)
    }

    pub fn survey(&self) -> Option<Vec<StyleRecord>> {
        self.state.lock().survey.clone()
    }

    /// Returns the cached survey, running it against `doc` on first use.
    pub fn survey_or_run(&self, doc: &Document, options: &SurveyOptions) -> Vec<StyleRecord> {
        let mut state = self.state.lock();
        if let Some(cached) = &state.survey {
            return cached.clone();
        }
        let records = survey_with(doc, options);
        state.survey = Some(records.clone());
        records
    }

    pub fn audit(&self) -> Option<AuditResult> {
        self.state.lock().audit.clone()
    }

    pub fn set_audit(&self, audit: AuditResult) {
        self.state.lock().audit = Some(audit);
    }

    pub fn screenshot(&self) -> Option<String> {
        self.state.lock().screenshot.clone()
    }

    pub fn set_screenshot(&self, screenshot: Option<String>) {
        self.state.lock().screenshot = screenshot;
    }

    /// Drops everything cached for the page.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.survey = None;
        state.audit = None;
        state.screenshot = None;
    }

    /// Moves the session to a new page; cached data belongs to the old one.
    pub fn navigate(&self, url: impl Into<String>) {
        let url = url.into();
        let mut state = self.state.lock();
        if state.url != url {
            debug!(from = %state.url, to = %url, "session navigated; clearing cache");
            *state = SessionState {
                url,
                ..SessionState::default()
            };
        }
    }
}
