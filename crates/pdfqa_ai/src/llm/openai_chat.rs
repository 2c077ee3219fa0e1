use pdfqa_core::error::AppError;
use serde::Deserialize;
use tracing::debug;

use super::{ChatCompletion, ChatModel, ChatRequest};
use crate::http::{call_error, decode_error, ServiceEndpoint};

#[derive(Debug, Clone)]
pub struct OpenAiChat {
    endpoint: ServiceEndpoint,
    api_key: String,
}

impl OpenAiChat {
    pub fn new(endpoint: ServiceEndpoint, api_key: impl Into<String>) -> Self {
        Self {
            endpoint,
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    total_tokens: u32,
}

pub(crate) fn into_completion(resp: CompletionResponse) -> Result<ChatCompletion, AppError> {
    let content = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();
    if content.trim().is_empty() {
        return Err(AppError::new(
            "GENERATION_FAILED",
            "Completion response was empty",
        ));
    }
    Ok(ChatCompletion {
        content,
        total_tokens: resp.usage.map(|u| u.total_tokens).unwrap_or(0),
    })
}

impl ChatModel for OpenAiChat {
    fn complete(&self, req: &ChatRequest) -> Result<ChatCompletion, AppError> {
        let url = self.endpoint.url("chat/completions");
        let resp = ureq::post(&url)
            .timeout(self.endpoint.timeout())
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(req)
            .map_err(|e| call_error("GENERATION", "Completion", e))?;

        let body: CompletionResponse = resp
            .into_json()
            .map_err(|e| decode_error("GENERATION", "completion", e))?;
        let completion = into_completion(body)?;
        debug!(model = %req.model, total_tokens = completion.total_tokens, "completion received");
        Ok(completion)
    }
}
