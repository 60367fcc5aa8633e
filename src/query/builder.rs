//! Query builder - mediates every edit of the active draft

use tokio::sync::watch;
use tracing::{debug, warn};

use super::model::{normalize_entity, Filter, FilterEdit, Operation, QueryDraft};
use crate::error::QueryError;
use crate::schema::Catalog;

/// What subscribers see after each change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSnapshot {
    pub version: u64,
    pub draft: QueryDraft,
    pub available_attributes: Vec<String>,
}

/// The draft version an asynchronous action was issued against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftTicket {
    version: u64,
}

impl DraftTicket {
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Owns the single active draft and keeps it consistent
///
/// Every operation is a plain replacement of draft fields; none performs I/O.
#[derive(Debug)]
pub struct QueryBuilder {
    draft: QueryDraft,
    catalog: Catalog,
    version: u64,
    notify: watch::Sender<DraftSnapshot>,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(Catalog::default())
    }
}

impl QueryBuilder {
    pub fn new(catalog: Catalog) -> Self {
        let draft = QueryDraft::default();
        let (notify, _) = watch::channel(DraftSnapshot {
            version: 0,
            draft: draft.clone(),
            available_attributes: Vec::new(),
        });

        QueryBuilder {
            draft,
            catalog,
            version: 0,
            notify,
        }
    }

    pub fn draft(&self) -> &QueryDraft {
        &self.draft
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Attributes selectable for the current entity
    pub fn available_attributes(&self) -> &[String] {
        self.draft
            .entity
            .as_deref()
            .and_then(|name| self.catalog.get(name))
            .map(|schema| schema.attributes.as_slice())
            .unwrap_or(&[])
    }

    /// Subscribe to draft changes
    pub fn subscribe(&self) -> watch::Receiver<DraftSnapshot> {
        self.notify.subscribe()
    }

    pub fn snapshot(&self) -> DraftSnapshot {
        DraftSnapshot {
            version: self.version,
            draft: self.draft.clone(),
            available_attributes: self.available_attributes().to_vec(),
        }
    }

    pub fn ticket(&self) -> DraftTicket {
        DraftTicket { version: self.version }
    }

    /// Whether the draft is unchanged since the ticket was issued
    pub fn is_current(&self, ticket: &DraftTicket) -> bool {
        ticket.version == self.version
    }

    pub fn set_operation(&mut self, operation: Operation) {
        self.draft.operation = operation;
        self.changed();
    }

    /// Select an entity ("" clears it); always resets the filters
    pub fn set_entity(&mut self, name: impl Into<String>) {
        let entity = normalize_entity(name.into());

        if let Some(name) = &entity {
            if self.catalog.get(name).is_none() {
                warn!(entity = %name, "entity is not in the catalog, no attributes available");
            }
        }

        self.draft.entity = entity;
        self.draft.filters = vec![Filter::default()];
        self.changed();
    }

    pub fn add_filter(&mut self) {
        self.draft.filters.push(Filter::default());
        self.changed();
    }

    /// Remove a filter; refuses to remove the last one
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove_filter(&mut self, index: usize) -> bool {
        let len = self.draft.filters.len();
        assert!(index < len, "filter index {} out of bounds ({} filters)", index, len);

        if len == 1 {
            debug!("refusing to remove the last filter");
            return false;
        }

        self.draft.filters.remove(index);
        self.changed();
        true
    }

    /// Replace one field of one filter
    ///
    /// Attributes must belong to the selected entity when the catalog knows
    /// it; the empty attribute is always accepted. Values are not checked.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn set_filter_field(&mut self, index: usize, edit: FilterEdit) -> Result<(), QueryError> {
        let len = self.draft.filters.len();
        assert!(index < len, "filter index {} out of bounds ({} filters)", index, len);

        if let FilterEdit::Attribute(attribute) = &edit {
            self.check_attribute(attribute)?;
        }

        self.draft.filters[index].apply(edit);
        self.changed();
        Ok(())
    }

    /// Replace the whole draft with one obtained elsewhere, e.g. by parsing
    pub fn load_draft(&mut self, mut draft: QueryDraft) {
        if draft.filters.is_empty() {
            draft.filters.push(Filter::default());
        }
        self.draft = draft;
        self.changed();
    }

    fn check_attribute(&self, attribute: &str) -> Result<(), QueryError> {
        if attribute.is_empty() {
            return Ok(());
        }

        let schema = match self.draft.entity.as_deref().and_then(|e| self.catalog.get(e)) {
            Some(schema) => schema,
            None => return Ok(()),
        };

        if schema.has_attribute(attribute) {
            Ok(())
        } else {
            Err(QueryError::validation(format!(
                "'{}' is not an attribute of {}",
                attribute, schema.name
            )))
        }
    }

    fn changed(&mut self) {
        self.version += 1;
        let snapshot = self.snapshot();
        debug!(version = snapshot.version, "draft changed");
        self.notify.send_replace(snapshot);
    }
}
