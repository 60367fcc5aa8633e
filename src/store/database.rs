//! SQLite database operations

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::{QueryId, QueryStore, SavedQuery, SavedQuerySummary};
use crate::error::QueryError;
use crate::schema::{EntityCatalog, EntitySchema, ModelDefinition};

/// Database handle
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create database directory: {}", dir.display()))?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;

        let db = Database { conn: Mutex::new(conn) };
        db.initialize()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn: Mutex::new(conn) };
        db.initialize()?;
        Ok(db)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, QueryError> {
        self.conn
            .lock()
            .map_err(|_| QueryError::unavailable("store", "database lock poisoned"))
    }

    /// Initialize the database schema
    fn initialize(&self) -> Result<()> {
        self.lock()?.execute_batch(r#"
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS models (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS attributes (
                id TEXT PRIMARY KEY,
                model_id TEXT,
                name TEXT NOT NULL,
                original_key TEXT,
                FOREIGN KEY(model_id) REFERENCES models(id)
            );

            -- Names are labels, not keys: duplicates are allowed
            CREATE TABLE IF NOT EXISTS saved_queries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                query_string TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_attributes_model ON attributes(model_id);
            CREATE INDEX IF NOT EXISTS idx_saved_queries_name ON saved_queries(name);
        "#).context("Failed to initialize database schema")?;

        Ok(())
    }

    /// Store models read from a schema file, replacing rows with the same ids
    ///
    /// Returns the number of attributes written.
    pub fn import_models(&self, models: &[ModelDefinition]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut count = 0;

        for model in models {
            tx.execute(
                "INSERT OR REPLACE INTO models (id, name) VALUES (?, ?)",
                params![&model.id, &model.name],
            )
            .with_context(|| format!("Failed to insert model {}", model.name))?;

            for attr in &model.attributes {
                tx.execute(
                    r#"INSERT OR REPLACE INTO attributes (id, model_id, name, original_key)
                       VALUES (?, ?, ?, ?)"#,
                    params![&attr.id, &model.id, &attr.name, &attr.original_key],
                )
                .with_context(|| format!("Failed to insert attribute {}", attr.name))?;
                count += 1;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    /// All models with their attributes, ordered by name
    pub fn entities(&self) -> Result<Vec<EntitySchema>, QueryError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"SELECT m.name, a.name
               FROM models m JOIN attributes a ON m.id = a.model_id
               ORDER BY m.name, a.name"#,
        )?;

        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut entities: Vec<EntitySchema> = Vec::new();
        for row in rows {
            let (model, attribute) = row?;
            match entities.last_mut() {
                Some(last) if last.name == model => last.attributes.push(attribute),
                _ => entities.push(EntitySchema::new(model, [attribute])),
            }
        }

        Ok(entities)
    }

    pub fn list_queries(&self) -> Result<Vec<SavedQuerySummary>, QueryError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, name FROM saved_queries ORDER BY name, id")?;

        let results = stmt.query_map([], |row| {
            Ok(SavedQuerySummary {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;

        results.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn create_query(&self, name: &str, query_string: &str) -> Result<QueryId, QueryError> {
        let conn = self.lock()?;
        let now = chrono::Utc::now().to_rfc3339();

        conn.execute(
            r#"INSERT INTO saved_queries (name, query_string, created_at, updated_at)
               VALUES (?, ?, ?, ?)"#,
            params![name, query_string, &now, &now],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, name, "saved query created");
        Ok(id)
    }

    pub fn get_query(&self, id: QueryId) -> Result<SavedQuery, QueryError> {
        let conn = self.lock()?;
        conn.query_row(
            r#"SELECT id, name, query_string, created_at, updated_at
               FROM saved_queries WHERE id = ?"#,
            params![id],
            |row| {
                Ok(SavedQuery {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    query_string: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        )
        .optional()?
        .ok_or(QueryError::NotFound(id))
    }

    pub fn delete_query(&self, id: QueryId) -> Result<(), QueryError> {
        let removed = self
            .lock()?
            .execute("DELETE FROM saved_queries WHERE id = ?", params![id])?;

        if removed == 0 {
            return Err(QueryError::NotFound(id));
        }
        debug!(id, "saved query deleted");
        Ok(())
    }

    /// Get statistics about the database
    pub fn stats(&self) -> Result<DatabaseStats> {
        let conn = self.lock()?;
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(DatabaseStats {
            model_count: count("SELECT COUNT(*) FROM models")?,
            attribute_count: count("SELECT COUNT(*) FROM attributes")?,
            query_count: count("SELECT COUNT(*) FROM saved_queries")?,
        })
    }
}

#[async_trait]
impl EntityCatalog for Database {
    async fn list_entities(&self) -> Result<Vec<EntitySchema>, QueryError> {
        self.entities()
    }
}

#[async_trait]
impl QueryStore for Database {
    async fn list(&self) -> Result<Vec<SavedQuerySummary>, QueryError> {
        self.list_queries()
    }

    async fn create(&self, name: &str, query_string: &str) -> Result<QueryId, QueryError> {
        self.create_query(name, query_string)
    }

    async fn get(&self, id: QueryId) -> Result<SavedQuery, QueryError> {
        self.get_query(id)
    }

    async fn delete(&self, id: QueryId) -> Result<(), QueryError> {
        self.delete_query(id)
    }
}

/// Database statistics
#[derive(Debug)]
pub struct DatabaseStats {
    pub model_count: usize,
    pub attribute_count: usize,
    pub query_count: usize,
}
