//! Query model - operations, conditions, filters and drafts

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

/// The data action a query expresses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    #[default]
    #[serde(rename = "find")]
    Find,
    #[serde(rename = "create")]
    Create,
    #[serde(rename = "update")]
    Update,
    #[serde(rename = "deleteAll")]
    DeleteAll,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Find,
        Operation::Create,
        Operation::Update,
        Operation::DeleteAll,
    ];

    /// Token used wherever the operation crosses a boundary
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Find => "find",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::DeleteAll => "deleteAll",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| {
                QueryError::validation(format!(
                    "Unknown operation '{}', expected one of: find, create, update, deleteAll",
                    s
                ))
            })
    }
}

/// Comparison operator applied by a filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    #[default]
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Condition {
    pub const ALL: [Condition; 6] = [
        Condition::Eq,
        Condition::Ne,
        Condition::Gt,
        Condition::Ge,
        Condition::Lt,
        Condition::Le,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Eq => "eq",
            Condition::Ne => "ne",
            Condition::Gt => "gt",
            Condition::Ge => "ge",
            Condition::Lt => "lt",
            Condition::Le => "le",
        }
    }

    /// Human readable label, e.g. "Greater or Equal"
    pub fn label(&self) -> &'static str {
        match self {
            Condition::Eq => "Equal",
            Condition::Ne => "Not Equal",
            Condition::Gt => "Greater Than",
            Condition::Ge => "Greater or Equal",
            Condition::Lt => "Less Than",
            Condition::Le => "Less or Equal",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Condition {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| {
                QueryError::validation(format!(
                    "Unknown condition '{}', expected one of: eq, ne, gt, ge, lt, le",
                    s
                ))
            })
    }
}

/// A single attribute/condition/value predicate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub attribute: String,
    pub condition: Condition,
    #[serde(rename = "condition_value")]
    pub condition_value: String,
}

impl Filter {
    pub fn new(attribute: impl Into<String>, condition: Condition, value: impl Into<String>) -> Self {
        Filter {
            attribute: attribute.into(),
            condition,
            condition_value: value.into(),
        }
    }

    /// Apply a single field edit, leaving the other fields untouched
    pub fn apply(&mut self, edit: FilterEdit) {
        match edit {
            FilterEdit::Attribute(attribute) => self.attribute = attribute,
            FilterEdit::Condition(condition) => self.condition = condition,
            FilterEdit::ConditionValue(value) => self.condition_value = value,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let attribute = if self.attribute.is_empty() { "<unset>" } else { &self.attribute };
        write!(f, "{} {} {:?}", attribute, self.condition, self.condition_value)
    }
}

/// Selector for one field of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Attribute,
    Condition,
    ConditionValue,
}

impl FromStr for FilterField {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attribute" | "attr" => Ok(FilterField::Attribute),
            "condition" | "cond" => Ok(FilterField::Condition),
            "conditionValue" | "condition_value" | "value" => Ok(FilterField::ConditionValue),
            other => Err(QueryError::validation(format!(
                "Unknown filter field '{}', expected attribute, condition or value",
                other
            ))),
        }
    }
}

/// A typed edit of one filter field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEdit {
    Attribute(String),
    Condition(Condition),
    ConditionValue(String),
}

impl FilterEdit {
    /// Build an edit from a field selector and its textual value
    pub fn parse(field: FilterField, value: &str) -> Result<Self, QueryError> {
        Ok(match field {
            FilterField::Attribute => FilterEdit::Attribute(value.to_string()),
            FilterField::Condition => FilterEdit::Condition(value.parse()?),
            FilterField::ConditionValue => FilterEdit::ConditionValue(value.to_string()),
        })
    }
}

/// The editable structured query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDraft {
    #[serde(rename = "function")]
    pub operation: Operation,

    #[serde(rename = "model", default, with = "entity_sentinel")]
    pub entity: Option<String>,

    #[serde(default)]
    pub filters: Vec<Filter>,
}

impl Default for QueryDraft {
    fn default() -> Self {
        QueryDraft {
            operation: Operation::default(),
            entity: None,
            filters: vec![Filter::default()],
        }
    }
}

impl QueryDraft {
    pub fn new(operation: Operation, entity: impl Into<String>, filters: Vec<Filter>) -> Self {
        QueryDraft {
            operation,
            entity: normalize_entity(entity.into()),
            filters,
        }
    }
}

/// The empty string stands for "no entity selected"
pub(crate) fn normalize_entity(name: String) -> Option<String> {
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Serializes an unset entity as "" to match the wire shape
mod entity_sentinel {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(entity: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(entity.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let name = Option::<String>::deserialize(d)?.unwrap_or_default();
        Ok(super::normalize_entity(name))
    }
}

/// Text produced by a generator together with the draft it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedResult {
    pub text: String,
    pub draft: QueryDraft,
}
