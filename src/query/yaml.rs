//! YAML query text - generation and parsing
//!
//! Generated text is a `#` header followed by a document of the form
//!
//! ```yaml
//! find:
//!   User:
//!   - age:
//!       gt: '18'
//!   - email:
//!       eq: a@b.com
//! ```
//!
//! Filters are a sequence so their order survives a round trip and the same
//! attribute may appear more than once. The older mapping form
//! (`User: {age: {gt: 18}}`) is still accepted when parsing.

use async_trait::async_trait;
use serde_yaml::{Mapping, Value};

use super::codec::{Generator, Parser};
use super::model::{Condition, Filter, Operation, QueryDraft};
use crate::error::QueryError;

const HEADER: &str = "#";

/// In-process generator and parser for YAML query text
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

#[async_trait]
impl Generator for YamlCodec {
    async fn generate(&self, draft: &QueryDraft) -> Result<String, QueryError> {
        to_yaml(draft)
    }
}

#[async_trait]
impl Parser for YamlCodec {
    async fn parse(&self, text: &str) -> Result<QueryDraft, QueryError> {
        from_yaml(text)
    }
}

/// Render a draft as YAML query text
pub fn to_yaml(draft: &QueryDraft) -> Result<String, QueryError> {
    let entity = draft
        .entity
        .as_deref()
        .ok_or_else(|| QueryError::Generate("no entity selected".to_string()))?;

    if draft.filters.is_empty() {
        return Err(QueryError::Generate("at least one filter is required".to_string()));
    }

    let mut filters = Vec::with_capacity(draft.filters.len());
    for (idx, filter) in draft.filters.iter().enumerate() {
        if filter.attribute.is_empty() {
            return Err(QueryError::Generate(format!(
                "filter {} has no attribute",
                idx + 1
            )));
        }

        let mut condition = Mapping::new();
        condition.insert(
            Value::String(filter.condition.as_str().to_string()),
            Value::String(filter.condition_value.clone()),
        );

        let mut entry = Mapping::new();
        entry.insert(Value::String(filter.attribute.clone()), Value::Mapping(condition));
        filters.push(Value::Mapping(entry));
    }

    let mut model = Mapping::new();
    model.insert(Value::String(entity.to_string()), Value::Sequence(filters));

    let mut root = Mapping::new();
    root.insert(
        Value::String(draft.operation.as_str().to_string()),
        Value::Mapping(model),
    );

    let body = serde_yaml::to_string(&Value::Mapping(root))
        .map_err(|e| QueryError::Generate(e.to_string()))?;

    Ok(format!("{}\n{}", HEADER, body))
}

/// Parse YAML query text back into a draft
pub fn from_yaml(text: &str) -> Result<QueryDraft, QueryError> {
    // The header line is a YAML comment, no stripping needed
    let root: Value = serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?;

    let root = root
        .as_mapping()
        .ok_or_else(|| parse_error("expected a mapping keyed by operation"))?;
    let (op_key, model) = single_entry(root, "operation")?;
    let operation: Operation = scalar_text(op_key)
        .ok_or_else(|| parse_error("operation must be a scalar"))?
        .parse()
        .map_err(|e: QueryError| parse_error(e.to_string()))?;

    let model = model
        .as_mapping()
        .ok_or_else(|| parse_error("expected a mapping keyed by entity"))?;
    let (entity_key, body) = single_entry(model, "entity")?;
    let entity = scalar_text(entity_key)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| parse_error("entity name must be a non-empty scalar"))?;

    let filters = match body {
        Value::Sequence(items) => {
            let mut filters = Vec::with_capacity(items.len());
            for item in items {
                let entry = item
                    .as_mapping()
                    .ok_or_else(|| parse_error("each filter must be a mapping"))?;
                let (attribute, conditions) = single_entry(entry, "attribute")?;
                let parsed = parse_conditions(attribute, conditions)?;
                if parsed.len() != 1 {
                    return Err(parse_error("each filter must have exactly one condition"));
                }
                filters.extend(parsed);
            }
            filters
        }
        Value::Mapping(legacy) => {
            let mut filters = Vec::new();
            for (attribute, conditions) in legacy {
                filters.extend(parse_conditions(attribute, conditions)?);
            }
            filters
        }
        _ => return Err(parse_error("expected a list of filters")),
    };

    if filters.is_empty() {
        return Err(parse_error("query has no filters"));
    }

    Ok(QueryDraft::new(operation, entity, filters))
}

fn parse_conditions(attribute: &Value, conditions: &Value) -> Result<Vec<Filter>, QueryError> {
    let attribute = scalar_text(attribute)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| parse_error("attribute name must be a non-empty scalar"))?;
    let conditions = conditions
        .as_mapping()
        .ok_or_else(|| parse_error(format!("attribute '{}' has no condition", attribute)))?;

    conditions
        .iter()
        .map(|(condition, value)| {
            let condition: Condition = scalar_text(condition)
                .ok_or_else(|| parse_error("condition must be a scalar"))?
                .parse()
                .map_err(|e: QueryError| parse_error(e.to_string()))?;
            let value = scalar_text(value).ok_or_else(|| {
                parse_error(format!("value for '{}' must be a scalar", attribute))
            })?;
            Ok(Filter::new(attribute.clone(), condition, value))
        })
        .collect()
}

fn single_entry<'a>(map: &'a Mapping, what: &str) -> Result<(&'a Value, &'a Value), QueryError> {
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Ok(entry),
        (None, _) => Err(parse_error(format!("missing {}", what))),
        (Some(_), Some(_)) => Err(parse_error(format!("expected exactly one {}", what))),
    }
}

/// Textual form of a scalar; null reads as the empty string
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

fn parse_error(message: impl Into<String>) -> QueryError {
    QueryError::Parse(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn adults() -> QueryDraft {
        QueryDraft::new(
            Operation::Find,
            "User",
            vec![
                Filter::new("age", Condition::Gt, "18"),
                Filter::new("email", Condition::Eq, "a@b.com"),
            ],
        )
    }

    #[test]
    fn test_generate_shape() {
        let text = to_yaml(&adults()).unwrap();

        assert!(text.starts_with("#\n"));
        let find = text.find("find:").unwrap();
        let user = text.find("User:").unwrap();
        let age = text.find("age:").unwrap();
        let email = text.find("email:").unwrap();
        assert!(find < user && user < age && age < email);
        assert!(text.contains("'18'") || text.contains("\"18\""));
    }

    #[test]
    fn test_round_trip() {
        let drafts = vec![
            adults(),
            QueryDraft::new(
                Operation::DeleteAll,
                "Order",
                vec![
                    Filter::new("total", Condition::Le, "0.5"),
                    Filter::new("total", Condition::Ge, "0"),
                    Filter::new("note", Condition::Ne, ""),
                ],
            ),
            QueryDraft::new(
                Operation::Update,
                "ShapeFile",
                vec![
                    Filter::new("enabled", Condition::Eq, "true"),
                    Filter::new("name", Condition::Lt, "null"),
                    Filter::new("label", Condition::Eq, "two\nlines: here"),
                ],
            ),
            QueryDraft::new(
                Operation::Create,
                "User",
                vec![Filter::new("id", Condition::Eq, "007")],
            ),
        ];

        for draft in drafts {
            let text = to_yaml(&draft).unwrap();
            assert_eq!(from_yaml(&text).unwrap(), draft, "round trip of:\n{}", text);
        }
    }

    #[test]
    fn test_generate_requires_entity_and_attributes() {
        let mut draft = adults();
        draft.entity = None;
        assert!(matches!(to_yaml(&draft), Err(QueryError::Generate(_))));

        let mut draft = adults();
        draft.filters[1].attribute.clear();
        assert!(matches!(to_yaml(&draft), Err(QueryError::Generate(_))));

        let mut draft = adults();
        draft.filters.clear();
        assert!(matches!(to_yaml(&draft), Err(QueryError::Generate(_))));
    }

    #[test]
    fn test_parse_legacy_mapping_form() {
        let text = "#\nfind:\n User:\n  age:\n   gt: 18\n  active:\n   eq: true\n";
        let draft = from_yaml(text).unwrap();

        assert_eq!(draft.operation, Operation::Find);
        assert_eq!(draft.entity.as_deref(), Some("User"));
        assert_eq!(
            draft.filters,
            vec![
                Filter::new("age", Condition::Gt, "18"),
                Filter::new("active", Condition::Eq, "true"),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_malformed_text() {
        let cases = [
            "",
            "#\n",
            "- find",
            "find: {}\ncreate: {}",
            "remove:\n  User:\n  - age:\n      eq: '1'",
            "find:\n  User:\n  - age:\n      like: '1'",
            "find:\n  User: []",
            "find:\n  User:\n  - age:\n      eq: '1'\n      ne: '2'",
            "find:\n  User:\n  - age: '1'",
            "find:\n  User: plain",
        ];

        for text in cases {
            assert!(
                matches!(from_yaml(text), Err(QueryError::Parse(_))),
                "expected parse failure for {:?}",
                text
            );
        }
    }

    #[tokio::test]
    async fn test_codec_traits() {
        let codec = YamlCodec;
        let text = codec.generate(&adults()).await.unwrap();
        assert_eq!(codec.parse(&text).await.unwrap(), adults());
    }

    fn arb_name() -> impl Strategy<Value = String> {
        "[A-Za-z_$][A-Za-z0-9_ .:#$-]{0,12}"
    }

    fn arb_value() -> impl Strategy<Value = String> {
        prop_oneof![
            "[ -~]{0,16}",
            "[0-9]{1,4}(\\.[0-9]{1,3})?",
            prop::sample::select(vec!["true", "no", "null", "~", "-", "[]", "{}", "0x1F", "1e3"])
                .prop_map(String::from),
            "[a-z]{1,6}\n[a-z]{1,6}",
        ]
    }

    fn arb_filter() -> impl Strategy<Value = Filter> {
        (arb_name(), prop::sample::select(Condition::ALL.to_vec()), arb_value())
            .prop_map(|(attribute, condition, value)| Filter::new(attribute, condition, value))
    }

    fn arb_draft() -> impl Strategy<Value = QueryDraft> {
        (
            prop::sample::select(Operation::ALL.to_vec()),
            arb_name(),
            prop::collection::vec(arb_filter(), 1..6),
        )
            .prop_map(|(operation, entity, filters)| QueryDraft::new(operation, entity, filters))
    }

    proptest! {
        #[test]
        fn generated_text_parses_back(draft in arb_draft()) {
            let text = to_yaml(&draft).unwrap();
            prop_assert_eq!(from_yaml(&text).unwrap(), draft);
        }
    }
}
