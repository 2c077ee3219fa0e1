use serde::{Deserialize, Serialize};
use std::fmt;

/// Single structured error shape shared by the pipeline, the service clients and the front end.
///
/// `code` is a stable SCREAMING_SNAKE identifier. Its prefix decides the [`ErrorKind`], and a
/// `_TIMEOUT` suffix marks an expired request deadline regardless of which service it hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
    pub retryable: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Embedding,
    Retrieval,
    Generation,
    Logging,
    Timeout,
    Config,
    Storage,
    Other,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is_timeout(&self) -> bool {
        self.code.ends_with("_TIMEOUT")
    }

    pub fn kind(&self) -> ErrorKind {
        if self.is_timeout() {
            return ErrorKind::Timeout;
        }
        let prefix = self.code.split('_').next().unwrap_or_default();
        match prefix {
            "VALIDATION" => ErrorKind::Validation,
            "EMBEDDING" => ErrorKind::Embedding,
            "RETRIEVAL" => ErrorKind::Retrieval,
            "GENERATION" => ErrorKind::Generation,
            "LOGGING" => ErrorKind::Logging,
            "CONFIG" => ErrorKind::Config,
            "DB" => ErrorKind::Storage,
            _ => ErrorKind::Other,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}
