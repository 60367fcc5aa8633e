//! Entity catalog collaborator

use async_trait::async_trait;

use super::{Catalog, EntitySchema};
use crate::error::QueryError;

/// Supplies the entities a query can target, once per session
#[async_trait]
pub trait EntityCatalog: Send + Sync {
    async fn list_entities(&self) -> Result<Vec<EntitySchema>, QueryError>;
}

#[async_trait]
impl EntityCatalog for Catalog {
    async fn list_entities(&self) -> Result<Vec<EntitySchema>, QueryError> {
        Ok(self.entities().to_vec())
    }
}
