//! Collaborator doubles for unit tests

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::QueryError;
use crate::query::{Generator, Parser, QueryDraft};
use crate::schema::{EntityCatalog, EntitySchema};
use crate::store::{QueryId, QueryStore, SavedQuery, SavedQuerySummary};

/// In-memory saved-query store that counts calls and can be switched off
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_id: QueryId,
    entries: BTreeMap<QueryId, SavedQuery>,
    calls: usize,
    unavailable: bool,
}

impl MemoryStore {
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    /// Start a counted call, failing if the store is switched off
    fn call(&self) -> Result<MutexGuard<'_, MemoryState>, QueryError> {
        let mut state = self.state();
        state.calls += 1;
        if state.unavailable {
            return Err(QueryError::unavailable("store", "connection refused"));
        }
        Ok(state)
    }

    pub fn calls(&self) -> usize {
        self.state().calls
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Remove an entry without going through the store API
    pub fn remove(&self, id: QueryId) {
        self.state().entries.remove(&id);
    }
}

#[async_trait]
impl QueryStore for MemoryStore {
    async fn list(&self) -> Result<Vec<SavedQuerySummary>, QueryError> {
        let state = self.call()?;
        let mut list: Vec<SavedQuerySummary> = state
            .entries
            .values()
            .map(|q| SavedQuerySummary { id: q.id, name: q.name.clone() })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(list)
    }

    async fn create(&self, name: &str, query_string: &str) -> Result<QueryId, QueryError> {
        let mut state = self.call()?;
        state.next_id += 1;
        let id = state.next_id;
        state.entries.insert(
            id,
            SavedQuery {
                id,
                name: name.to_string(),
                query_string: query_string.to_string(),
                created_at: String::new(),
                updated_at: String::new(),
            },
        );
        Ok(id)
    }

    async fn get(&self, id: QueryId) -> Result<SavedQuery, QueryError> {
        self.call()?
            .entries
            .get(&id)
            .cloned()
            .ok_or(QueryError::NotFound(id))
    }

    async fn delete(&self, id: QueryId) -> Result<(), QueryError> {
        self.call()?
            .entries
            .remove(&id)
            .map(|_| ())
            .ok_or(QueryError::NotFound(id))
    }
}

/// Parser that rejects everything
pub struct FailingParser;

#[async_trait]
impl Parser for FailingParser {
    async fn parse(&self, _text: &str) -> Result<QueryDraft, QueryError> {
        Err(QueryError::Parse("unexpected token".to_string()))
    }
}

/// Generator whose backend is down
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _draft: &QueryDraft) -> Result<String, QueryError> {
        Err(QueryError::unavailable("generator", "connection refused"))
    }
}

/// Catalog whose backend is down
pub struct FailingCatalog;

#[async_trait]
impl EntityCatalog for FailingCatalog {
    async fn list_entities(&self) -> Result<Vec<EntitySchema>, QueryError> {
        Err(QueryError::unavailable("catalog", "connection refused"))
    }
}
