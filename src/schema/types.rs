//! Schema type definitions

use serde::{Deserialize, Serialize};

/// A named data model and the attributes it declares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,

    #[serde(default)]
    pub attributes: Vec<String>,
}

impl EntitySchema {
    pub fn new<I, S>(name: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EntitySchema {
            name: name.into(),
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
    }
}

/// The set of entities available in a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entities: Vec<EntitySchema>,
}

impl Catalog {
    pub fn new(entities: Vec<EntitySchema>) -> Self {
        Catalog { entities }
    }

    pub fn get(&self, name: &str) -> Option<&EntitySchema> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn entities(&self) -> &[EntitySchema] {
        &self.entities
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// A model read from a schema file, before it is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDefinition {
    /// Key of the model in the schema file
    pub id: String,

    /// Model name derived from the dotted attribute paths
    pub name: String,

    pub attributes: Vec<AttributeDefinition>,
}

/// An attribute read from a schema file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    pub id: String,
    pub name: String,

    /// Full dotted path as written in the schema file
    pub original_key: String,
}
