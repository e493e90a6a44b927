//! Evidence returned by the retrieval collaborator

use serde::{Deserialize, Serialize};

/// One retrieved search hit; read-only inside the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    /// Full page text, when the backend provides it
    #[serde(default)]
    pub body: Option<String>,
    /// Relevance score reported by the backend
    #[serde(default)]
    pub score: f64,
}

impl EvidenceItem {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            body: None,
            score: 0.0,
        }
    }
}
