use pdfqa_core::domain::{Answer, Query, ResponsePolicy};
use pdfqa_core::error::AppError;
use tracing::{info, warn};

use crate::llm::{ChatMessage, ChatModel, ChatRequest};

pub mod prompts;

/// The answer to show and log, plus the failure that replaced it with the sentinel, if any.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub answer: Answer,
    pub error: Option<AppError>,
}

pub struct AnswerGenerator<'a> {
    llm: &'a dyn ChatModel,
    model: String,
}

impl<'a> AnswerGenerator<'a> {
    pub fn new(llm: &'a dyn ChatModel, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    pub fn build_request(
        &self,
        evidence_texts: &[String],
        query: &Query,
        policy: ResponsePolicy,
        temperature: f32,
    ) -> ChatRequest {
        let prompt =
            prompts::grounded_answer_prompt(evidence_texts, query.as_str(), policy.instruction());
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(prompts::SYSTEM_PROMPT),
                ChatMessage::user(prompt),
            ],
            max_tokens: policy.max_tokens(),
            temperature,
        }
    }

    /// One completion call. Failure never propagates: the sentinel answer takes its place.
    pub fn generate(
        &self,
        evidence_texts: &[String],
        query: &Query,
        policy: ResponsePolicy,
        temperature: f32,
    ) -> GenerationOutcome {
        let req = self.build_request(evidence_texts, query, policy, temperature);
        match self.llm.complete(&req) {
            Ok(c) => {
                info!(
                    policy = policy.as_str(),
                    passages = evidence_texts.len(),
                    total_tokens = c.total_tokens,
                    "answer generated"
                );
                GenerationOutcome {
                    answer: Answer {
                        text: c.content,
                        tokens_used: c.total_tokens,
                    },
                    error: None,
                }
            }
            Err(e) => {
                warn!(code = %e.code, "generation failed; using sentinel answer");
                GenerationOutcome {
                    answer: Answer::no_response(),
                    error: Some(e),
                }
            }
        }
    }
}
