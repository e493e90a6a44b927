//! Evidence retrieval collaborator

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::models::EvidenceItem;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    #[error("search backend unavailable: {0}")]
    Unavailable(String),
    #[error("search failed: {0}")]
    Failed(String),
}

/// Search the web (or any index) for evidence about a query
#[async_trait]
pub trait EvidenceRetrieval: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<EvidenceItem>, RetrievalError>;
}

/// Retrieval that never finds anything
///
/// Every claim then short-circuits to UNVERIFIABLE without a model call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRetrieval;

#[async_trait]
impl EvidenceRetrieval for DisabledRetrieval {
    async fn search(&self, query: &str) -> Result<Vec<EvidenceItem>, RetrievalError> {
        debug!(query_len = query.len(), "Evidence retrieval disabled, returning no results");
        Ok(Vec::new())
    }
}

/// Fixed evidence list, returned for every query
#[derive(Debug, Clone, Default)]
pub struct StaticRetrieval {
    items: Vec<EvidenceItem>,
}

impl StaticRetrieval {
    pub fn new(items: Vec<EvidenceItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl EvidenceRetrieval for StaticRetrieval {
    async fn search(&self, _query: &str) -> Result<Vec<EvidenceItem>, RetrievalError> {
        Ok(self.items.clone())
    }
}
