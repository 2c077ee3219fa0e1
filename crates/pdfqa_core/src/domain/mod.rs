use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Number of passages requested from the vector index for every query.
pub const DEFAULT_TOP_K: u32 = 8;

/// Answer recorded when the completion call fails.
pub const NO_RESPONSE_SENTINEL: &str = "No response generated.";

/// Literal reply the model is instructed to give when the context has nothing relevant.
pub const INSUFFICIENT_CONTEXT_SENTINEL: &str =
    "Context does not provide sufficient information to answer the question.";

/// A validated, non-empty user query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct Query(String);

impl Query {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(AppError::new("VALIDATION_EMPTY_QUERY", "Enter the Query"));
        }
        Ok(Self(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Query {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Query::parse(&value)
    }
}

impl From<Query> for String {
    fn from(q: Query) -> Self {
        q.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Length budget chosen by the user for one submission.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePolicy {
    #[default]
    Short,
    Long,
}

impl ResponsePolicy {
    pub fn max_tokens(&self) -> u32 {
        match self {
            ResponsePolicy::Short => 800,
            ResponsePolicy::Long => 4096,
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            ResponsePolicy::Short => "Provide a short answer.",
            ResponsePolicy::Long => "Provide a detailed answer.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponsePolicy::Short => "short",
            ResponsePolicy::Long => "long",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Some(Self::Short),
            "long" => Some(Self::Long),
            _ => None,
        }
    }
}

/// One retrieved passage with the metadata needed to cite it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceItem {
    pub text: String,
    pub source_title: String,
    pub page_range: String,
    pub link: String,
    pub relevance_score: f32,
}

/// Up to K evidence items, highest relevance first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    pub items: Vec<EvidenceItem>,
}

impl RetrievalResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub tokens_used: u32,
}

impl Answer {
    pub fn no_response() -> Self {
        Self {
            text: NO_RESPONSE_SENTINEL.to_string(),
            tokens_used: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackValue {
    #[default]
    Unset,
    Negative,
    Positive,
}

impl FeedbackValue {
    /// Thumbs control score: 0 is down, 1 is up.
    pub fn from_score(score: Option<i64>) -> Self {
        match score {
            Some(0) => FeedbackValue::Negative,
            Some(1) => FeedbackValue::Positive,
            _ => FeedbackValue::Unset,
        }
    }

    pub fn score(&self) -> Option<i64> {
        match self {
            FeedbackValue::Unset => None,
            FeedbackValue::Negative => Some(0),
            FeedbackValue::Positive => Some(1),
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, FeedbackValue::Unset)
    }
}
