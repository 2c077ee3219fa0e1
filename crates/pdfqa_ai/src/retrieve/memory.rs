use std::cell::RefCell;
use std::fs;
use std::path::Path;

use pdfqa_core::error::AppError;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::info;

use super::similarity;
use super::{IndexMatch, IndexQuery, MatchMetadata, VectorIndex};
use crate::embeddings::Embedder;

/// One entry of a passages file. A missing `vector` is filled in by the embedder.
#[derive(Debug, Clone, Deserialize)]
pub struct PassageRecord {
    #[serde(flatten)]
    pub metadata: MatchMetadata,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
}

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    namespace: String,
    vector: Vec<f32>,
    norm: f32,
    metadata: MatchMetadata,
}

/// Brute-force cosine index held in memory, for offline runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    dims: RefCell<Option<usize>>,
    entries: RefCell<Vec<Entry>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a passage vector. The id is derived from namespace and passage text, so
    /// re-inserting the same passage replaces it.
    pub fn upsert(
        &self,
        namespace: &str,
        vector: Vec<f32>,
        metadata: MatchMetadata,
    ) -> Result<String, AppError> {
        if vector.is_empty() {
            return Err(AppError::new(
                "RETRIEVAL_UPSERT_FAILED",
                "Vector must not be empty",
            ));
        }
        {
            let mut dims = self.dims.borrow_mut();
            let current = *dims;
            match current {
                Some(d) if d != vector.len() => {
                    return Err(AppError::new(
                        "RETRIEVAL_UPSERT_FAILED",
                        "Vector dims do not match index dims",
                    )
                    .with_details(format!("index_dims={d}; vector_dims={}", vector.len())));
                }
                Some(_) => {}
                None => *dims = Some(vector.len()),
            }
        }

        let payload = format!(
            "namespace={}\ntext={}",
            namespace,
            metadata.text.as_deref().unwrap_or_default()
        );
        let id = hex::encode(Sha256::digest(payload.as_bytes()));
        let entry = Entry {
            id: id.clone(),
            namespace: namespace.to_string(),
            norm: similarity::l2_norm(&vector),
            vector,
            metadata,
        };

        let mut entries = self.entries.borrow_mut();
        entries.retain(|e| e.id != id);
        entries.push(entry);
        Ok(id)
    }

    /// Load a JSON array of passages into `namespace`. Returns the number of passages stored.
    pub fn seed_from_file(
        &self,
        path: &Path,
        namespace: &str,
        embedder: &dyn Embedder,
        embedding_model: &str,
    ) -> Result<usize, AppError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::new("RETRIEVAL_SEED_FAILED", "Failed to read passages file")
                .with_details(format!("path={}; err={e}", path.display()))
        })?;
        let records: Vec<PassageRecord> = serde_json::from_str(&raw).map_err(|e| {
            AppError::new("RETRIEVAL_SEED_FAILED", "Failed to parse passages file")
                .with_details(format!("path={}; err={e}", path.display()))
        })?;

        let mut embedded = 0usize;
        for record in records {
            let text = match record.metadata.text.as_deref() {
                Some(t) if !t.trim().is_empty() => t,
                _ => {
                    return Err(AppError::new(
                        "RETRIEVAL_SEED_FAILED",
                        "Every passage needs non-empty text",
                    )
                    .with_details(format!("path={}", path.display())));
                }
            };
            let vector = match record.vector {
                Some(v) => v,
                None => {
                    embedded += 1;
                    embedder.embed(embedding_model, text)?
                }
            };
            self.upsert(namespace, vector, record.metadata)?;
        }

        info!(passages = self.len(), embedded, "memory index seeded");
        Ok(self.len())
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl VectorIndex for InMemoryIndex {
    fn query(&self, req: &IndexQuery<'_>) -> Result<Vec<IndexMatch>, AppError> {
        if let Some(d) = *self.dims.borrow() {
            if req.vector.len() != d {
                return Err(AppError::new(
                    "RETRIEVAL_FAILED",
                    "Query embedding dims do not match index dims",
                )
                .with_details(format!("index_dims={d}; query_dims={}", req.vector.len())));
            }
        }
        let qnorm = similarity::l2_norm(req.vector);
        if qnorm == 0.0 {
            return Err(AppError::new(
                "RETRIEVAL_FAILED",
                "Query embedding norm is zero",
            ));
        }

        let mut hits: Vec<IndexMatch> = self
            .entries
            .borrow()
            .iter()
            .filter(|e| e.namespace == req.namespace && e.norm > 0.0)
            .map(|e| IndexMatch {
                id: e.id.clone(),
                score: similarity::cosine_similarity(req.vector, &e.vector, qnorm, e.norm),
                metadata: req.include_metadata.then(|| e.metadata.clone()),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        hits.truncate(req.top_k as usize);
        Ok(hits)
    }
}
