use pdfqa_core::error::AppError;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Embedder;
use crate::http::{call_error, decode_error, ServiceEndpoint};

#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    endpoint: ServiceEndpoint,
    api_key: String,
}

impl OpenAiEmbedder {
    pub fn new(endpoint: ServiceEndpoint, api_key: impl Into<String>) -> Self {
        Self {
            endpoint,
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EmbeddingsResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

pub(crate) fn first_embedding(resp: EmbeddingsResponse) -> Result<Vec<f32>, AppError> {
    let vector = resp
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .unwrap_or_default();
    if vector.is_empty() {
        return Err(AppError::new(
            "EMBEDDING_FAILED",
            "Embeddings response was empty",
        ));
    }
    if vector.iter().any(|x| !x.is_finite()) {
        return Err(AppError::new(
            "EMBEDDING_FAILED",
            "Embeddings response contained non-finite values",
        ));
    }
    Ok(vector)
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        if input.trim().is_empty() {
            return Err(AppError::new(
                "VALIDATION_EMPTY_QUERY",
                "Refusing to embed empty input",
            ));
        }

        let url = self.endpoint.url("embeddings");
        let resp = ureq::post(&url)
            .timeout(self.endpoint.timeout())
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(EmbeddingsRequest { model, input })
            .map_err(|e| call_error("EMBEDDING", "Embeddings", e))?;

        let body: EmbeddingsResponse = resp
            .into_json()
            .map_err(|e| decode_error("EMBEDDING", "embeddings", e))?;
        let vector = first_embedding(body)?;
        debug!(model, dims = vector.len(), "query embedded");
        Ok(vector)
    }
}
