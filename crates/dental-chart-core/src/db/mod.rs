//! Database layer for the dental chart engine.

mod schema;
mod catalog;
mod conditions;
mod history;
mod patients;
mod procedures;

pub use schema::*;
pub use history::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::models::{ActorRef, EntryReference, SurfaceSet};

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction spanning every statement issued through this
    /// database until it is committed or dropped.
    pub fn begin(&self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }
}

/// Split an actor into its stored columns.
fn actor_columns(actor: &ActorRef) -> (&str, Option<&str>) {
    (actor.id.as_str(), actor.display_name.as_deref())
}

fn actor_from_columns(id: String, name: Option<String>) -> ActorRef {
    ActorRef {
        id,
        display_name: name,
    }
}

/// Stored columns of an entry reference:
/// `(catalog_id, custom_name, custom_code, custom_description)`.
fn reference_columns(
    reference: &EntryReference,
) -> (Option<i64>, Option<&str>, Option<&str>, Option<&str>) {
    match reference {
        EntryReference::Catalog { catalog_id, .. } => (Some(*catalog_id), None, None, None),
        EntryReference::Custom {
            name,
            code,
            description,
        } => (None, Some(name.as_str()), Some(code.as_str()), description.as_deref()),
    }
}

/// Reference columns as read back, joined with the catalog.
struct ReferenceRow {
    catalog_id: Option<i64>,
    catalog_name: Option<String>,
    catalog_code: Option<String>,
    custom_name: Option<String>,
    custom_code: Option<String>,
    custom_description: Option<String>,
}

impl TryFrom<ReferenceRow> for EntryReference {
    type Error = DbError;

    fn try_from(row: ReferenceRow) -> Result<Self, Self::Error> {
        match (row.catalog_id, row.custom_name, row.custom_code) {
            (Some(catalog_id), _, _) => Ok(EntryReference::Catalog {
                catalog_id,
                name: row.catalog_name.unwrap_or_default(),
                code: row.catalog_code.unwrap_or_default(),
            }),
            (None, Some(name), Some(code)) => Ok(EntryReference::Custom {
                name,
                code,
                description: row.custom_description,
            }),
            _ => Err(DbError::Constraint(
                "Entry has neither a catalog nor a custom reference".into(),
            )),
        }
    }
}

fn parse_surfaces(raw: &str) -> DbResult<SurfaceSet> {
    SurfaceSet::parse(raw).map_err(|e| DbError::Constraint(format!("Stored surface invalid: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.db");
        {
            let db = Database::open(&path).unwrap();
            db.conn()
                .execute(
                    "INSERT INTO patients (patient_id, clinic_id, name, created_at) VALUES ('p1', 'c1', 'Jane', 'now')",
                    [],
                )
                .unwrap();
        }
        let db = Database::open(&path).unwrap();
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        // Check that tables exist
        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in [
            "patients",
            "condition_catalog",
            "procedure_catalog",
            "tooth_conditions",
            "tooth_procedures",
            "procedure_notes",
            "chart_history",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {}", table);
        }
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        {
            let _tx = db.begin().unwrap();
            db.conn()
                .execute(
                    "INSERT INTO patients (patient_id, clinic_id, name, created_at) VALUES ('p1', 'c1', 'Jane', 'now')",
                    [],
                )
                .unwrap();
        }
        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
