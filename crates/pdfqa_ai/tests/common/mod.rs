#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use pdfqa_ai::embeddings::Embedder;
use pdfqa_ai::llm::{ChatCompletion, ChatModel, ChatRequest};
use pdfqa_ai::retrieve::{IndexMatch, IndexQuery, MatchMetadata, VectorIndex};
use pdfqa_core::error::AppError;
use pdfqa_core::logs::{LogName, LogSink};

#[derive(Default)]
pub struct MockEmbedder {
    pub calls: Cell<u32>,
    pub fail: bool,
}

impl Embedder for MockEmbedder {
    fn embed(&self, _model: &str, _input: &str) -> Result<Vec<f32>, AppError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail {
            return Err(AppError::new("EMBEDDING_FAILED", "embedding service down"));
        }
        Ok(vec![1.0, 0.0, 0.0])
    }
}

#[derive(Default)]
pub struct MockIndex {
    pub calls: Cell<u32>,
    pub matches: Vec<IndexMatch>,
    pub fail: bool,
    pub last_top_k: Cell<u32>,
}

impl VectorIndex for MockIndex {
    fn query(&self, req: &IndexQuery<'_>) -> Result<Vec<IndexMatch>, AppError> {
        self.calls.set(self.calls.get() + 1);
        self.last_top_k.set(req.top_k);
        assert!(req.include_metadata);
        if self.fail {
            return Err(AppError::new("RETRIEVAL_FAILED", "index unavailable"));
        }
        Ok(self.matches.clone())
    }
}

#[derive(Default)]
pub struct MockLlm {
    pub requests: RefCell<Vec<ChatRequest>>,
    pub fail: bool,
}

impl MockLlm {
    pub fn calls(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl ChatModel for MockLlm {
    fn complete(&self, req: &ChatRequest) -> Result<ChatCompletion, AppError> {
        self.requests.borrow_mut().push(req.clone());
        if self.fail {
            return Err(
                AppError::new("GENERATION_TIMEOUT", "completion timed out").with_retryable(true),
            );
        }
        Ok(ChatCompletion {
            content: "- X is a thing.".to_string(),
            total_tokens: 123,
        })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub rows: RefCell<Vec<(LogName, Vec<String>)>>,
    pub fail: bool,
}

impl RecordingSink {
    pub fn rows_for(&self, log: LogName) -> Vec<Vec<String>> {
        self.rows
            .borrow()
            .iter()
            .filter(|(l, _)| *l == log)
            .map(|(_, r)| r.clone())
            .collect()
    }
}

impl LogSink for RecordingSink {
    fn append_row(&self, log: LogName, row: &[String]) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::new("LOGGING_FAILED", "sheet unavailable"));
        }
        self.rows.borrow_mut().push((log, row.to_vec()));
        Ok(())
    }
}

pub fn fixed_clock() -> Result<String, AppError> {
    Ok("2026-02-10 09:30:00".to_string())
}

pub fn passage(id: &str, score: f32, text: &str) -> IndexMatch {
    IndexMatch {
        id: id.to_string(),
        score,
        metadata: Some(MatchMetadata {
            text: Some(text.to_string()),
            pdf_name: Some(format!("{id}.pdf")),
            page_range: Some(serde_json::json!("1-2")),
            link: Some(format!("https://docs.example.org/{id}.pdf")),
        }),
    }
}
