//! Saved-query library - cached list and save/load/delete lifecycle

use tracing::{debug, info, warn};

use crate::error::QueryError;
use crate::query::{Parser, QueryBuilder};
use crate::store::{QueryId, QueryStore, SavedQuery, SavedQuerySummary};

/// The saved entry the active draft was last saved as or loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedEntry {
    pub id: QueryId,
    pub name: String,
}

/// Client-side view of the saved-query store
pub struct SavedQueryLibrary<S> {
    store: S,
    entries: Vec<SavedQuerySummary>,
    current: Option<LoadedEntry>,
}

impl<S: QueryStore> SavedQueryLibrary<S> {
    pub fn new(store: S) -> Self {
        SavedQueryLibrary {
            store,
            entries: Vec::new(),
            current: None,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Cached entries, as of the last refresh
    pub fn entries(&self) -> &[SavedQuerySummary] {
        &self.entries
    }

    pub fn current(&self) -> Option<&LoadedEntry> {
        self.current.as_ref()
    }

    /// Reload the cached list; on failure the cache is kept as it was
    pub async fn refresh(&mut self) -> Result<&[SavedQuerySummary], QueryError> {
        self.entries = self.store.list().await?;
        debug!(count = self.entries.len(), "saved queries refreshed");
        Ok(&self.entries)
    }

    /// Save generated text under a name
    pub async fn save(&mut self, name: &str, text: &str) -> Result<QueryId, QueryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QueryError::validation("Please enter a query name"));
        }
        if text.is_empty() {
            return Err(QueryError::validation("No query to save. Generate a query first."));
        }

        let id = self.store.create(name, text).await?;
        info!(id, name, "query saved");

        self.current = Some(LoadedEntry {
            id,
            name: name.to_string(),
        });
        self.refresh_quietly().await;

        Ok(id)
    }

    /// Fetch a saved query, parse it and hand the draft to the builder
    ///
    /// The builder is only touched once fetching and parsing have succeeded.
    pub async fn load<P>(
        &mut self,
        id: QueryId,
        parser: &P,
        builder: &mut QueryBuilder,
    ) -> Result<SavedQuery, QueryError>
    where
        P: Parser + ?Sized,
    {
        let saved = match self.store.get(id).await {
            Ok(saved) => saved,
            Err(err) => {
                self.reconcile(&err).await;
                return Err(err);
            }
        };

        let draft = parser.parse(&saved.query_string).await?;
        builder.load_draft(draft);

        self.current = Some(LoadedEntry {
            id: saved.id,
            name: saved.name.clone(),
        });
        info!(id, name = %saved.name, "query loaded");

        Ok(saved)
    }

    /// Delete a saved query; the active draft is left alone
    pub async fn delete(&mut self, id: QueryId) -> Result<(), QueryError> {
        if let Err(err) = self.store.delete(id).await {
            self.reconcile(&err).await;
            return Err(err);
        }

        self.entries.retain(|entry| entry.id != id);
        if self.current.as_ref().is_some_and(|c| c.id == id) {
            self.current = None;
        }
        info!(id, "query deleted");

        self.refresh_quietly().await;
        Ok(())
    }

    /// After a not-found the cache is stale, so reload it and forget the
    /// entry if it was the loaded one
    async fn reconcile(&mut self, err: &QueryError) {
        if let QueryError::NotFound(id) = err {
            if self.current.as_ref().is_some_and(|c| c.id == *id) {
                self.current = None;
            }
            self.refresh_quietly().await;
        }
    }

    async fn refresh_quietly(&mut self) {
        if let Err(err) = self.refresh().await {
            warn!(error = %err, "failed to refresh saved queries");
        }
    }
}
