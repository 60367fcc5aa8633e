//! Generator and parser collaborators

use async_trait::async_trait;

use super::model::QueryDraft;
use crate::error::QueryError;

/// Turns a draft into query text
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, draft: &QueryDraft) -> Result<String, QueryError>;
}

/// Turns query text back into a draft
///
/// Must accept every text its paired [`Generator`] produces and return a
/// draft equal to the one generated from.
#[async_trait]
pub trait Parser: Send + Sync {
    async fn parse(&self, text: &str) -> Result<QueryDraft, QueryError>;
}
