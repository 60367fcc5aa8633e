//! Session controller - the active draft, its last result and the library
//!
//! Network-bound actions are tagged with the draft version they were issued
//! against. A generated result that arrives after the draft has changed is
//! dropped instead of being shown next to a draft it does not describe.

use tracing::{debug, warn};

use crate::error::QueryError;
use crate::library::SavedQueryLibrary;
use crate::query::{DraftTicket, GeneratedResult, Generator, Parser, QueryBuilder, QueryDraft};
use crate::schema::{Catalog, EntityCatalog};
use crate::store::{QueryId, QueryStore};

/// A submit in flight
#[derive(Debug, Clone)]
pub struct SubmitTicket {
    ticket: DraftTicket,
    draft: QueryDraft,
}

impl SubmitTicket {
    /// The draft as it was when the submit was issued
    pub fn draft(&self) -> &QueryDraft {
        &self.draft
    }
}

/// How a completed submit was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    Applied,
    /// The draft changed while generating; the response was dropped
    Superseded,
}

pub struct Session<G, P, S> {
    builder: QueryBuilder,
    library: SavedQueryLibrary<S>,
    generator: G,
    parser: P,
    result: Option<GeneratedResult>,
}

impl<G, P, S> Session<G, P, S>
where
    G: Generator,
    P: Parser,
    S: QueryStore,
{
    /// Load the catalog and the saved-query list
    ///
    /// Neither failure is fatal: the session starts with an empty catalog or
    /// an empty list instead.
    pub async fn start<C>(catalog: &C, generator: G, parser: P, store: S) -> Self
    where
        C: EntityCatalog + ?Sized,
    {
        let entities = match catalog.list_entities().await {
            Ok(entities) => entities,
            Err(err) => {
                warn!(error = %err, "failed to load entities");
                Vec::new()
            }
        };
        debug!(count = entities.len(), "entities loaded");

        let mut session = Session {
            builder: QueryBuilder::new(Catalog::new(entities)),
            library: SavedQueryLibrary::new(store),
            generator,
            parser,
            result: None,
        };

        if let Err(err) = session.library.refresh().await {
            warn!(error = %err, "failed to load saved queries");
        }

        session
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut QueryBuilder {
        &mut self.builder
    }

    pub fn library(&self) -> &SavedQueryLibrary<S> {
        &self.library
    }

    /// The last generated (or loaded) query text
    pub fn result(&self) -> Option<&GeneratedResult> {
        self.result.as_ref()
    }

    /// Whether the last result still describes the active draft
    pub fn result_is_current(&self) -> bool {
        self.result
            .as_ref()
            .is_some_and(|r| &r.draft == self.builder.draft())
    }

    /// Capture the draft for generation
    pub fn begin_submit(&self) -> SubmitTicket {
        SubmitTicket {
            ticket: self.builder.ticket(),
            draft: self.builder.draft().clone(),
        }
    }

    /// Apply the generator's answer unless the draft moved on meanwhile
    ///
    /// A superseded answer is dropped whether it succeeded or failed.
    pub fn complete_submit(
        &mut self,
        ticket: SubmitTicket,
        outcome: Result<String, QueryError>,
    ) -> Result<Submitted, QueryError> {
        if !self.builder.is_current(&ticket.ticket) {
            debug!(
                issued = ticket.ticket.version(),
                current = self.builder.version(),
                "dropping stale generate response"
            );
            return Ok(Submitted::Superseded);
        }

        let text = outcome?;
        self.result = Some(GeneratedResult {
            text,
            draft: ticket.draft,
        });
        Ok(Submitted::Applied)
    }

    /// Generate text for the active draft
    pub async fn submit(&mut self) -> Result<Submitted, QueryError> {
        let ticket = self.begin_submit();
        let outcome = self.generator.generate(ticket.draft()).await;
        self.complete_submit(ticket, outcome)
    }

    /// Save the last generated text under `name`
    pub async fn save(&mut self, name: &str) -> Result<QueryId, QueryError> {
        let text = self.result.as_ref().map(|r| r.text.as_str()).unwrap_or_default();
        self.library.save(name, text).await
    }

    /// Replace the active draft with a saved query
    pub async fn load(&mut self, id: QueryId) -> Result<(), QueryError> {
        let saved = self.library.load(id, &self.parser, &mut self.builder).await?;
        self.result = Some(GeneratedResult {
            text: saved.query_string,
            draft: self.builder.draft().clone(),
        });
        Ok(())
    }

    pub async fn delete(&mut self, id: QueryId) -> Result<(), QueryError> {
        self.library.delete(id).await
    }

    /// Reload the saved-query list
    pub async fn refresh(&mut self) -> Result<(), QueryError> {
        self.library.refresh().await.map(|_| ())
    }
}
