use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::debug;

use crate::error::AppError;

pub mod sqlite;

pub use sqlite::{SqliteLogSink, StoredLogRow};

/// The two append-only logs kept on the spreadsheet service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogName {
    /// `[timestamp, query, answer, tokens_used]`
    Usage,
    /// `[timestamp, query, answer, feedback_label]`
    Feedback,
}

impl LogName {
    pub fn sheet_name(&self) -> &'static str {
        match self {
            LogName::Usage => "GPT_log",
            LogName::Feedback => "Feedback_log",
        }
    }
}

/// Append-only row store. Implementations must append exactly one row per call.
pub trait LogSink {
    fn append_row(&self, log: LogName, row: &[String]) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
    Appended,
    Skipped,
}

pub type Clock = fn() -> Result<String, AppError>;

pub fn now_timestamp() -> Result<String, AppError> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    OffsetDateTime::now_utc().format(format).map_err(|e| {
        AppError::new("LOGGING_TIME_FAILED", "Failed to format log timestamp")
            .with_details(e.to_string())
    })
}

pub fn feedback_label(score: i64) -> &'static str {
    match score {
        0 => "Negative",
        1 => "Positive",
        _ => "Not Provided",
    }
}

/// Writes one `GPT_log` row per generated answer.
pub struct UsageLogger<'a> {
    sink: &'a dyn LogSink,
    clock: Clock,
}

impl<'a> UsageLogger<'a> {
    pub fn new(sink: &'a dyn LogSink) -> Self {
        Self {
            sink,
            clock: now_timestamp,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn log(&self, query: &str, tokens_used: u32, answer: &str) -> Result<(), AppError> {
        let row = vec![
            (self.clock)()?,
            query.to_string(),
            answer.to_string(),
            tokens_used.to_string(),
        ];
        debug!(tokens_used, "appending usage row");
        self.sink.append_row(LogName::Usage, &row)
    }
}

/// Writes one `Feedback_log` row per thumbs event.
pub struct FeedbackLogger<'a> {
    sink: &'a dyn LogSink,
    clock: Clock,
}

impl<'a> FeedbackLogger<'a> {
    pub fn new(sink: &'a dyn LogSink) -> Self {
        Self {
            sink,
            clock: now_timestamp,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Missing feedback or a missing/blank query is not an error: nothing is written.
    pub fn log(
        &self,
        feedback: Option<i64>,
        query: Option<&str>,
        answer: &str,
    ) -> Result<LogOutcome, AppError> {
        let (score, query) = match (feedback, query) {
            (Some(score), Some(q)) if !q.trim().is_empty() => (score, q),
            _ => return Ok(LogOutcome::Skipped),
        };

        let row = vec![
            (self.clock)()?,
            query.to_string(),
            answer.to_string(),
            feedback_label(score).to_string(),
        ];
        debug!(label = feedback_label(score), "appending feedback row");
        self.sink.append_row(LogName::Feedback, &row)?;
        Ok(LogOutcome::Appended)
    }
}
