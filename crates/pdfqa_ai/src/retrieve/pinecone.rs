use pdfqa_core::error::AppError;
use serde::Deserialize;

use super::{IndexMatch, IndexQuery, VectorIndex};
use crate::http::{call_error, decode_error, ServiceEndpoint};

/// Data-plane client for one Pinecone index, addressed by its host URL.
#[derive(Debug, Clone)]
pub struct PineconeIndex {
    endpoint: ServiceEndpoint,
    api_key: String,
}

impl PineconeIndex {
    pub fn new(endpoint: ServiceEndpoint, api_key: impl Into<String>) -> Self {
        Self {
            endpoint,
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub(crate) matches: Vec<IndexMatch>,
}

impl VectorIndex for PineconeIndex {
    fn query(&self, req: &IndexQuery<'_>) -> Result<Vec<IndexMatch>, AppError> {
        let url = self.endpoint.url("query");
        let resp = ureq::post(&url)
            .timeout(self.endpoint.timeout())
            .set("Api-Key", &self.api_key)
            .set("X-Pinecone-API-Version", "2024-07")
            .send_json(req)
            .map_err(|e| call_error("RETRIEVAL", "Vector query", e))?;

        let body: QueryResponse = resp
            .into_json()
            .map_err(|e| decode_error("RETRIEVAL", "vector query", e))?;
        Ok(body.matches)
    }
}
