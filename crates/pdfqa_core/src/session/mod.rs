use serde::{Deserialize, Serialize};

use crate::domain::{Answer, FeedbackValue, Query, ResponsePolicy, RetrievalResult};
use crate::evidence::{assemble, EvidenceSet};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Submitted,
    Retrieved,
    /// Terminal: retrieval came back empty, generation is skipped.
    NoContext,
    Answered,
    FeedbackPending,
    Done,
}

impl SessionPhase {
    pub fn accepts_feedback(&self) -> bool {
        matches!(self, SessionPhase::FeedbackPending | SessionPhase::Done)
    }
}

/// Per-session pipeline state.
///
/// Stages only run while their field is `None`, which is what keeps re-renders from repeating
/// network calls. Nothing here is persisted; one instance lives for one user session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    pub query: Option<Query>,
    pub policy: ResponsePolicy,
    pub retrieval: Option<RetrievalResult>,
    pub answer: Option<Answer>,
    pub feedback: FeedbackValue,
    pub phase: SessionPhase,
    pub usage_logged: bool,
    pub logged_feedback: Option<FeedbackValue>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wipe every field back to the session-start configuration.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// A submission always starts from an empty session, even for identical query text.
    pub fn begin_submission(&mut self, query: Query, policy: ResponsePolicy) {
        self.clear();
        self.query = Some(query);
        self.policy = policy;
        self.phase = SessionPhase::Submitted;
    }

    pub fn needs_retrieval(&self) -> bool {
        self.query.is_some() && self.retrieval.is_none()
    }

    pub fn set_retrieval(&mut self, result: RetrievalResult) {
        self.phase = if result.is_empty() {
            SessionPhase::NoContext
        } else {
            SessionPhase::Retrieved
        };
        self.retrieval = Some(result);
    }

    pub fn has_context(&self) -> bool {
        self.retrieval.as_ref().map(|r| !r.is_empty()).unwrap_or(false)
    }

    pub fn needs_answer(&self) -> bool {
        self.has_context() && self.answer.is_none()
    }

    pub fn set_answer(&mut self, answer: Answer) {
        self.answer = Some(answer);
        self.phase = SessionPhase::Answered;
    }

    /// The answer has been shown together with the feedback prompt.
    pub fn mark_rendered(&mut self) {
        if self.phase == SessionPhase::Answered {
            self.phase = SessionPhase::FeedbackPending;
        }
    }

    /// Records feedback. Returns `true` when the value still has to be logged.
    ///
    /// An unset value leaves the session untouched, so stray scores never erase a recorded vote.
    pub fn record_feedback(&mut self, value: FeedbackValue) -> bool {
        if !self.phase.accepts_feedback() || !value.is_set() {
            return false;
        }
        self.feedback = value;
        self.phase = SessionPhase::Done;
        value.is_set() && self.logged_feedback != Some(value)
    }

    pub fn evidence(&self) -> EvidenceSet {
        self.retrieval.as_ref().map(assemble).unwrap_or_default()
    }

    pub fn query_text(&self) -> Option<&str> {
        self.query.as_ref().map(|q| q.as_str())
    }

    pub fn answer_text(&self) -> &str {
        self.answer.as_ref().map(|a| a.text.as_str()).unwrap_or_default()
    }
}
