//! Schema loader - parses model schema files (*.cdm)
//!
//! A schema file maps model ids to attribute maps, where each attribute value
//! is a dotted path ending in `<Model>.<attribute>`:
//!
//! ```yaml
//! m1:
//!   a1: Atomiton.DBA.ShapeFile.enterpriseId
//!   a2: Atomiton.DBA.ShapeFile.name
//!   a3: $ncm
//! ```

use anyhow::{Context, Result};
use serde_yaml::{Mapping, Value};
use std::path::Path;
use tracing::debug;

use super::{AttributeDefinition, ModelDefinition};

/// Placeholder value for attributes that carry no mapping
const NO_MAPPING: &str = "$ncm";

/// Load model definitions from a schema file
pub fn load_schema(path: &Path) -> Result<Vec<ModelDefinition>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema file: {}", path.display()))?;

    parse_schema(&contents)
        .with_context(|| format!("Failed to parse schema file: {}", path.display()))
}

/// Parse schema file contents, preserving the order models appear in
pub fn parse_schema(contents: &str) -> Result<Vec<ModelDefinition>> {
    let root: Mapping = serde_yaml::from_str(contents)?;
    let mut models = Vec::new();

    for (model_key, attributes) in &root {
        let Some(model_id) = scalar_to_string(model_key) else {
            continue;
        };
        let Some(attributes) = attributes.as_mapping() else {
            debug!(model = %model_id, "skipping model without an attribute map");
            continue;
        };

        let paths: Vec<(String, String)> = attributes
            .iter()
            .filter_map(|(k, v)| Some((scalar_to_string(k)?, v.as_str()?.to_string())))
            .filter(|(_, path)| path != NO_MAPPING)
            .collect();

        // The first dotted path names the model: A.B.ShapeFile.id -> ShapeFile
        let name = paths.iter().find_map(|(_, path)| {
            let parts: Vec<&str> = path.split('.').collect();
            (parts.len() >= 2).then(|| parts[parts.len() - 2].to_string())
        });

        let Some(name) = name.filter(|n| !n.is_empty()) else {
            debug!(model = %model_id, "could not determine model name");
            continue;
        };

        let attributes = paths
            .into_iter()
            .filter_map(|(id, path)| {
                let attr_name = path.rsplit('.').next()?.to_string();
                Some(AttributeDefinition {
                    id,
                    name: attr_name,
                    original_key: path,
                })
            })
            .collect();

        models.push(ModelDefinition {
            id: model_id,
            name,
            attributes,
        });
    }

    Ok(models)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
