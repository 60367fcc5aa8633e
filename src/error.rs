//! Error taxonomy shared by the builder, library and collaborators

use thiserror::Error;

use crate::store::QueryId;

/// Errors surfaced at an action boundary (submit, save, load, delete)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// Input rejected before any collaborator was contacted
    #[error("{0}")]
    Validation(String),

    /// The saved query no longer exists
    #[error("saved query {0} not found")]
    NotFound(QueryId),

    /// The generator refused the draft
    #[error("failed to generate query: {0}")]
    Generate(String),

    /// The parser refused the text
    #[error("failed to parse query: {0}")]
    Parse(String),

    /// A collaborator could not be reached or answered with a failure
    #[error("{service} unavailable: {message}")]
    Unavailable {
        service: &'static str,
        message: String,
    },
}

impl QueryError {
    pub fn validation(message: impl Into<String>) -> Self {
        QueryError::Validation(message.into())
    }

    pub fn unavailable(service: &'static str, message: impl ToString) -> Self {
        QueryError::Unavailable {
            service,
            message: message.to_string(),
        }
    }

    /// Collaborator failures the user may retry, as opposed to rejected input
    pub fn is_transient(&self) -> bool {
        matches!(self, QueryError::Unavailable { .. } | QueryError::NotFound(_))
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(err: rusqlite::Error) -> Self {
        QueryError::unavailable("store", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(QueryError::NotFound(3).is_transient());
        assert!(QueryError::unavailable("catalog", "connection refused").is_transient());
        assert!(!QueryError::validation("Please enter a query name").is_transient());
        assert!(!QueryError::Parse("bad yaml".to_string()).is_transient());
    }

    #[test]
    fn test_display() {
        let err = QueryError::unavailable("store", "disk I/O error");
        assert_eq!(err.to_string(), "store unavailable: disk I/O error");
        assert_eq!(QueryError::NotFound(7).to_string(), "saved query 7 not found");
    }
}
