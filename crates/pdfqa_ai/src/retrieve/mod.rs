use pdfqa_core::domain::{EvidenceItem, RetrievalResult, DEFAULT_TOP_K};
use pdfqa_core::error::AppError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub mod memory;
pub mod pinecone;
mod similarity;

pub use memory::{InMemoryIndex, PassageRecord};
pub use pinecone::PineconeIndex;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexQuery<'a> {
    pub namespace: &'a str,
    pub vector: &'a [f32],
    pub top_k: u32,
    pub include_metadata: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MatchMetadata {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub pdf_name: Option<String>,
    /// Stored either as `"3-5"` or as a bare page number.
    #[serde(default)]
    pub page_range: Option<serde_json::Value>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<MatchMetadata>,
}

/// Nearest-neighbour search over stored passage vectors.
pub trait VectorIndex {
    fn query(&self, req: &IndexQuery<'_>) -> Result<Vec<IndexMatch>, AppError>;
}

/// Relevance cut-off applied after the index returns its top-K.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum ScoreFilter {
    #[default]
    None,
    MinScore(f32),
}

impl ScoreFilter {
    pub fn from_min_score(min: Option<f32>) -> Self {
        min.map(ScoreFilter::MinScore).unwrap_or_default()
    }

    fn keeps(&self, score: f32) -> bool {
        match self {
            ScoreFilter::None => true,
            ScoreFilter::MinScore(min) => score >= *min,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub top_k: u32,
    pub namespace: String,
    pub filter: ScoreFilter,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            namespace: String::new(),
            filter: ScoreFilter::None,
        }
    }
}

/// Search result plus the service error, if any, that forced it to be empty.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub result: RetrievalResult,
    pub error: Option<AppError>,
}

fn page_label(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn to_evidence(m: IndexMatch) -> Option<EvidenceItem> {
    let meta = m.metadata.unwrap_or_default();
    let text = match meta.text {
        Some(t) if !t.trim().is_empty() => t,
        _ => {
            warn!(match_id = %m.id, "dropping match without passage text");
            return None;
        }
    };
    Some(EvidenceItem {
        text,
        source_title: meta.pdf_name.unwrap_or_default(),
        page_range: meta.page_range.as_ref().map(page_label).unwrap_or_default(),
        link: meta.link.unwrap_or_default(),
        relevance_score: m.score,
    })
}

/// Query the index and shape matches into a ranked [`RetrievalResult`].
///
/// Never fails: a service error yields an empty result with the error attached, so the caller
/// can report it and still finish the interaction.
pub fn search(index: &dyn VectorIndex, vector: &[f32], opts: &SearchOptions) -> SearchOutcome {
    let top_k = opts.top_k.max(1);
    let req = IndexQuery {
        namespace: &opts.namespace,
        vector,
        top_k,
        include_metadata: true,
    };

    let mut matches = match index.query(&req) {
        Ok(m) => m,
        Err(e) => {
            warn!(code = %e.code, "vector search failed; continuing with no context");
            return SearchOutcome {
                result: RetrievalResult::empty(),
                error: Some(e),
            };
        }
    };

    matches.retain(|m| m.score.is_finite() && opts.filter.keeps(m.score));
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    matches.truncate(top_k as usize);

    let items: Vec<EvidenceItem> = matches.into_iter().filter_map(to_evidence).collect();
    debug!(hits = items.len(), top_k, "vector search complete");
    SearchOutcome {
        result: RetrievalResult { items },
        error: None,
    }
}
