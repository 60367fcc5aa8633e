//! Store module - saved-query persistence

mod database;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

pub use database::Database;

/// Identifier assigned by the store to a saved query
pub type QueryId = i64;

/// List entry for a saved query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedQuerySummary {
    pub id: QueryId,
    pub name: String,
}

/// A saved query with its text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedQuery {
    pub id: QueryId,
    pub name: String,
    pub query_string: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Persistent storage for saved queries
#[async_trait]
pub trait QueryStore: Send + Sync {
    async fn list(&self) -> Result<Vec<SavedQuerySummary>, QueryError>;

    async fn create(&self, name: &str, query_string: &str) -> Result<QueryId, QueryError>;

    /// Fails with [`QueryError::NotFound`] for an unknown id
    async fn get(&self, id: QueryId) -> Result<SavedQuery, QueryError>;

    /// Fails with [`QueryError::NotFound`] for an unknown id
    async fn delete(&self, id: QueryId) -> Result<(), QueryError>;
}
