use pdfqa_core::domain::{Answer, FeedbackValue, Query, ResponsePolicy, RetrievalResult};
use pdfqa_core::error::{AppError, ErrorKind};
use pdfqa_core::evidence::EvidenceRow;
use pdfqa_core::logs::{FeedbackLogger, LogOutcome, LogSink, UsageLogger};
use pdfqa_core::session::{SessionPhase, SessionState};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::answer::AnswerGenerator;
use crate::embeddings::Embedder;
use crate::llm::ChatModel;
use crate::retrieve::{search, SearchOptions, VectorIndex};

pub const NO_CONTEXT_MESSAGE: &str = "Pinecone has no relevant context.";
pub const FEEDBACK_PROMPT: &str = "Was this answer helpful to you?";
pub const FEEDBACK_THANKS: &str = "Thank you for your feedback!";

/// User interactions, dispatched one at a time per session.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Submit { text: String, policy: ResponsePolicy },
    /// Repaint without new input.
    Render,
    /// Thumbs control score: 0 = down, 1 = up.
    Feedback(i64),
    Clear,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-visible message. Error-backed notices keep the code and kind of the failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub code: Option<String>,
    pub kind: Option<ErrorKind>,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            code: None,
            kind: None,
        }
    }

    fn from_error(level: NoticeLevel, context: Option<&str>, err: &AppError) -> Self {
        let message = match context {
            Some(context) => format!("{context}: {}", err.message),
            None => err.message.clone(),
        };
        Self {
            level,
            message,
            code: Some(err.code.clone()),
            kind: Some(err.kind()),
        }
    }

    /// Timeouts are worth retrying by submitting the query again.
    pub fn is_retryable_timeout(&self) -> bool {
        self.kind == Some(ErrorKind::Timeout)
    }
}

/// Everything the front end needs to draw one frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct View {
    pub phase: SessionPhase,
    pub query: Option<String>,
    pub policy: ResponsePolicy,
    pub answer: Option<Answer>,
    pub ask_feedback: bool,
    pub feedback: FeedbackValue,
    pub evidence_rows: Vec<EvidenceRow>,
    pub evidence_texts: Vec<String>,
    pub notices: Vec<Notice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub embedding_model: String,
    pub temperature: f32,
    pub search: SearchOptions,
}

/// Drives one session through embed, search, generate and log.
///
/// Every stage is populate-if-empty against [`SessionState`], so any number of `Render` or
/// `Feedback` events after a `Submit` reuse the stored evidence and answer.
pub struct Pipeline<'a> {
    embedder: &'a dyn Embedder,
    index: &'a dyn VectorIndex,
    generator: AnswerGenerator<'a>,
    usage: UsageLogger<'a>,
    feedback: FeedbackLogger<'a>,
    settings: PipelineSettings,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        index: &'a dyn VectorIndex,
        llm: &'a dyn ChatModel,
        chat_model: &str,
        sink: &'a dyn LogSink,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            embedder,
            index,
            generator: AnswerGenerator::new(llm, chat_model),
            usage: UsageLogger::new(sink),
            feedback: FeedbackLogger::new(sink),
            settings,
        }
    }

    /// Swap in custom loggers, e.g. with a fixed clock.
    pub fn with_loggers(mut self, usage: UsageLogger<'a>, feedback: FeedbackLogger<'a>) -> Self {
        self.usage = usage;
        self.feedback = feedback;
        self
    }

    pub fn handle(&self, session: &mut SessionState, event: Event) -> View {
        let mut notices = Vec::new();
        match event {
            Event::Clear => {
                session.clear();
                debug!("session cleared");
            }
            Event::Submit { text, policy } => match Query::parse(&text) {
                Ok(query) => {
                    info!(policy = policy.as_str(), "query submitted");
                    session.begin_submission(query, policy);
                    self.advance(session, &mut notices);
                }
                Err(e) => {
                    session.clear();
                    notices.push(Notice::from_error(NoticeLevel::Warning, None, &e));
                }
            },
            Event::Render => self.advance(session, &mut notices),
            Event::Feedback(score) => {
                self.advance(session, &mut notices);
                self.apply_feedback(session, score, &mut notices);
            }
        }
        render(session, notices)
    }

    fn advance(&self, session: &mut SessionState, notices: &mut Vec<Notice>) {
        let Some(query) = session.query.clone() else {
            return;
        };

        if session.needs_retrieval() {
            let result = self.retrieve(&query, notices);
            session.set_retrieval(result);
        }

        if session.needs_answer() {
            let evidence = session.evidence();
            let outcome = self.generator.generate(
                &evidence.texts,
                &query,
                session.policy,
                self.settings.temperature,
            );
            if let Some(e) = &outcome.error {
                notices.push(Notice::from_error(
                    NoticeLevel::Error,
                    Some("Error generating response"),
                    e,
                ));
            }
            session.set_answer(outcome.answer);
        }

        if !session.usage_logged {
            if let Some(answer) = session.answer.clone() {
                session.usage_logged = true;
                let logged = self
                    .usage
                    .log(query.as_str(), answer.tokens_used, &answer.text);
                if let Err(e) = logged {
                    warn!(code = %e.code, "usage logging failed");
                    notices.push(Notice::from_error(
                        NoticeLevel::Warning,
                        Some("Failed to log tokens"),
                        &e,
                    ));
                }
            }
        }
    }

    fn retrieve(&self, query: &Query, notices: &mut Vec<Notice>) -> RetrievalResult {
        let vector = match self.embedder.embed(&self.settings.embedding_model, query.as_str()) {
            Ok(v) => v,
            Err(e) => {
                warn!(code = %e.code, "embedding failed; skipping retrieval");
                notices.push(Notice::from_error(
                    NoticeLevel::Error,
                    Some("Error embedding query"),
                    &e,
                ));
                return RetrievalResult::empty();
            }
        };

        let outcome = search(self.index, &vector, &self.settings.search);
        if let Some(e) = &outcome.error {
            notices.push(Notice::from_error(
                NoticeLevel::Error,
                Some("Error querying the index"),
                e,
            ));
        }
        outcome.result
    }

    fn apply_feedback(&self, session: &mut SessionState, score: i64, notices: &mut Vec<Notice>) {
        if !session.phase.accepts_feedback() {
            debug!(phase = ?session.phase, "feedback ignored");
            return;
        }
        let value = FeedbackValue::from_score(Some(score));
        if !session.record_feedback(value) {
            return;
        }

        match self
            .feedback
            .log(value.score(), session.query_text(), session.answer_text())
        {
            Ok(LogOutcome::Appended) => {
                session.logged_feedback = Some(value);
                notices.push(Notice::new(NoticeLevel::Success, FEEDBACK_THANKS));
            }
            Ok(LogOutcome::Skipped) => {}
            Err(e) => {
                warn!(code = %e.code, "feedback logging failed");
                notices.push(Notice::from_error(
                    NoticeLevel::Warning,
                    Some("Failed to log feedback"),
                    &e,
                ));
            }
        }
    }
}

fn render(session: &mut SessionState, mut notices: Vec<Notice>) -> View {
    session.mark_rendered();
    if session.phase == SessionPhase::NoContext {
        notices.push(Notice::new(NoticeLevel::Info, NO_CONTEXT_MESSAGE));
    }

    let evidence = session.evidence();
    View {
        phase: session.phase,
        query: session.query_text().map(str::to_string),
        policy: session.policy,
        answer: session.answer.clone(),
        ask_feedback: session.phase.accepts_feedback(),
        feedback: session.feedback,
        evidence_rows: evidence.table_rows(),
        evidence_texts: evidence.texts,
        notices,
    }
}
