//! CLI command implementations

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::config::Config;
use crate::error::QueryError;
use crate::library::SavedQueryLibrary;
use crate::query::yaml::from_yaml;
use crate::query::{Filter, FilterEdit, Generator, Operation, QueryBuilder, YamlCodec};
use crate::schema::{load_schema, Catalog, EntityCatalog};
use crate::session::Session;
use crate::store::{Database, QueryId};

use super::format_draft;

/// Write a default config file
pub fn init() -> Result<()> {
    let path = Config::create_default()?;
    println!("✓ Config file: {}", path.display());
    Ok(())
}

/// Import a model schema file into the catalog
pub fn load_schema_file(db_path: &Path, file: Option<PathBuf>, config: &Config) -> Result<()> {
    let Some(file) = file.or_else(|| config.schema.clone()) else {
        bail!("No schema file given and none configured");
    };

    let models = load_schema(&file)?;
    let db = Database::open(db_path)?;
    let count = db.import_models(&models)?;
    let stats = db.stats()?;

    println!("✓ Loaded schema from {}", file.display());
    println!("  {} models in file, {} attributes processed", models.len(), count);
    println!(
        "  catalog now has {} models, {} attributes ({} saved queries kept)",
        stats.model_count, stats.attribute_count, stats.query_count
    );

    Ok(())
}

/// List entities and their attributes
pub fn models(db_path: &Path) -> Result<()> {
    let db = Database::open(db_path)?;
    let entities = db.entities()?;

    if entities.is_empty() {
        println!("No entities. Import a schema with `bmlq load-schema <file>`.");
        return Ok(());
    }

    for entity in entities {
        println!("{}: {}", entity.name, entity.attributes.join(", "));
    }

    Ok(())
}

/// Split "attribute:condition:value" (the value may contain ':')
pub fn parse_filter_spec(spec: &str) -> Result<Filter, QueryError> {
    let mut parts = spec.splitn(3, ':');
    let attribute = parts.next().unwrap_or_default().trim();
    let condition = parts.next().ok_or_else(|| {
        QueryError::validation(format!(
            "Invalid filter '{}', expected attribute:condition:value",
            spec
        ))
    })?;
    let value = parts.next().unwrap_or_default();

    Ok(Filter::new(attribute, condition.trim().parse()?, value))
}

/// Build a query from flags, print its YAML and optionally save it
pub async fn generate(
    db_path: &Path,
    operation: &str,
    entity: &str,
    filters: &[String],
    save: Option<&str>,
) -> Result<()> {
    let db = Database::open(db_path)?;
    let entities = db.list_entities().await.unwrap_or_else(|err| {
        warn!(error = %err, "failed to load entities");
        Vec::new()
    });

    let mut builder = QueryBuilder::new(Catalog::new(entities));
    builder.set_operation(operation.parse::<Operation>()?);
    builder.set_entity(entity);

    for (idx, spec) in filters.iter().enumerate() {
        let filter = parse_filter_spec(spec)?;
        if idx > 0 {
            builder.add_filter();
        }
        builder.set_filter_field(idx, FilterEdit::Attribute(filter.attribute))?;
        builder.set_filter_field(idx, FilterEdit::Condition(filter.condition))?;
        builder.set_filter_field(idx, FilterEdit::ConditionValue(filter.condition_value))?;
    }

    let text = YamlCodec.generate(builder.draft()).await?;
    print!("{}", text);

    if let Some(name) = save {
        let mut library = SavedQueryLibrary::new(db);
        let id = library.save(name, &text).await?;
        eprintln!("✓ Saved as #{} ({})", id, name.trim());
    }

    Ok(())
}

/// Parse YAML query text from a file or stdin
pub fn parse(file: Option<&Path>, json: bool) -> Result<()> {
    let text = match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            text
        }
    };

    let draft = from_yaml(&text)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&draft)?);
    } else {
        print!("{}", format_draft(&draft));
    }

    Ok(())
}

/// List saved queries
pub async fn list(db_path: &Path) -> Result<()> {
    let mut library = SavedQueryLibrary::new(Database::open(db_path)?);
    let entries = library.refresh().await?;

    if entries.is_empty() {
        println!("No saved queries yet");
        return Ok(());
    }

    for entry in entries {
        println!("{:>4}  {}", entry.id, entry.name);
    }

    Ok(())
}

/// Print a saved query's text
pub fn show(db_path: &Path, id: QueryId) -> Result<()> {
    let db = Database::open(db_path)?;
    let saved = db.get_query(id)?;

    eprintln!("#{} {} (saved {})", saved.id, saved.name, saved.created_at);
    print!("{}", saved.query_string);

    Ok(())
}

/// Load a saved query back into a draft
pub async fn load(db_path: &Path, id: QueryId, json: bool) -> Result<()> {
    let mut library = SavedQueryLibrary::new(Database::open(db_path)?);
    let mut builder = QueryBuilder::default();
    library.load(id, &YamlCodec, &mut builder).await?;

    let draft = builder.draft();
    if json {
        println!("{}", serde_json::to_string_pretty(draft)?);
    } else {
        print!("{}", format_draft(draft));
    }

    Ok(())
}

/// Delete a saved query
pub async fn delete(db_path: &Path, id: QueryId) -> Result<()> {
    let mut library = SavedQueryLibrary::new(Database::open(db_path)?);
    library.delete(id).await?;
    println!("✓ Deleted query #{}", id);
    Ok(())
}

/// Run the interactive form
pub async fn shell(db_path: &Path) -> Result<()> {
    let db = Database::open(db_path)?;
    let entities = Catalog::new(db.entities().unwrap_or_else(|err| {
        warn!(error = %err, "failed to load entities");
        Vec::new()
    }));

    let mut session = Session::start(&entities, YamlCodec, YamlCodec, db).await;
    super::shell::run(&mut session).await
}
