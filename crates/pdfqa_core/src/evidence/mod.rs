use serde::{Deserialize, Serialize};

use crate::domain::RetrievalResult;

/// Retrieved evidence projected into parallel columns.
///
/// `texts` feeds prompt construction; `titles`, `pages` and `links` feed the citation table.
/// All four always have the same length.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvidenceSet {
    pub texts: Vec<String>,
    pub titles: Vec<String>,
    pub pages: Vec<String>,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvidenceRow {
    pub pdf: String,
    pub page: String,
    pub link: String,
}

impl EvidenceSet {
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Rows for the Pdf / Page / Link table, in retrieval order.
    pub fn table_rows(&self) -> Vec<EvidenceRow> {
        self.titles
            .iter()
            .zip(self.pages.iter())
            .zip(self.links.iter())
            .map(|((pdf, page), link)| EvidenceRow {
                pdf: pdf.clone(),
                page: page.clone(),
                link: link.clone(),
            })
            .collect()
    }
}

pub fn assemble(result: &RetrievalResult) -> EvidenceSet {
    let mut out = EvidenceSet::default();
    for item in result.items.iter() {
        out.texts.push(item.text.clone());
        out.titles.push(item.source_title.clone());
        out.pages.push(item.page_range.clone());
        out.links.push(item.link.clone());
    }
    out
}
