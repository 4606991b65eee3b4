//! Condition and procedure catalog database operations.

use rusqlite::{params, OptionalExtension};
use strsim::{jaro_winkler, normalized_levenshtein};

use super::{Database, DbError, DbResult};
use crate::models::{ConditionCatalogEntry, Price, ProcedureCatalogEntry};

impl Database {
    // =========================================================================
    // Condition catalog
    // =========================================================================

    /// Insert or update a condition catalog entry.
    pub fn upsert_condition_entry(&self, entry: &ConditionCatalogEntry) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO condition_catalog (id, name, code, description, color_code, icon, is_standard)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                code = excluded.code,
                description = excluded.description,
                color_code = excluded.color_code,
                icon = excluded.icon,
                is_standard = excluded.is_standard
            "#,
            params![
                entry.id,
                entry.name,
                entry.code,
                entry.description,
                entry.color_code,
                entry.icon,
                entry.is_standard,
            ],
        )?;
        Ok(())
    }

    /// Get a condition catalog entry by ID.
    pub fn get_condition_entry(&self, id: i64) -> DbResult<Option<ConditionCatalogEntry>> {
        self.conn
            .query_row(
                r#"
                SELECT id, name, code, description, color_code, icon, is_standard
                FROM condition_catalog
                WHERE id = ?
                "#,
                [id],
                map_condition_entry,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List the condition catalog ordered by name.
    pub fn list_condition_entries(&self) -> DbResult<Vec<ConditionCatalogEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, code, description, color_code, icon, is_standard
            FROM condition_catalog
            ORDER BY name
            "#,
        )?;
        let rows = stmt.query_map([], map_condition_entry)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Search conditions by name, code or description, best match first.
    pub fn search_condition_entries(
        &self,
        query: &str,
        limit: usize,
    ) -> DbResult<Vec<ConditionCatalogEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, code, description, color_code, icon, is_standard
            FROM condition_catalog
            WHERE name LIKE ?1 ESCAPE '\' OR code LIKE ?1 ESCAPE '\' OR description LIKE ?1 ESCAPE '\'
            "#,
        )?;
        let rows = stmt.query_map([like_pattern(query)], map_condition_entry)?;
        let entries = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(rank_by_name(query, entries, |e| e.name.as_str(), limit))
    }

    // =========================================================================
    // Procedure catalog
    // =========================================================================

    /// Insert or update a procedure catalog entry.
    pub fn upsert_procedure_entry(&self, entry: &ProcedureCatalogEntry) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO procedure_catalog (
                id, name, code, description, category,
                default_price_cents, duration_minutes, is_standard
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                code = excluded.code,
                description = excluded.description,
                category = excluded.category,
                default_price_cents = excluded.default_price_cents,
                duration_minutes = excluded.duration_minutes,
                is_standard = excluded.is_standard
            "#,
            params![
                entry.id,
                entry.name,
                entry.code,
                entry.description,
                entry.category,
                entry.default_price.cents(),
                entry.duration_minutes,
                entry.is_standard,
            ],
        )?;
        Ok(())
    }

    /// Get a procedure catalog entry by ID.
    pub fn get_procedure_entry(&self, id: i64) -> DbResult<Option<ProcedureCatalogEntry>> {
        let result = self
            .conn
            .query_row(
                r#"
                SELECT id, name, code, description, category,
                       default_price_cents, duration_minutes, is_standard
                FROM procedure_catalog
                WHERE id = ?
                "#,
                [id],
                map_procedure_row,
            )
            .optional()?;

        result.map(|row| row.try_into()).transpose()
    }

    /// List the procedure catalog ordered by name.
    pub fn list_procedure_entries(&self) -> DbResult<Vec<ProcedureCatalogEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, code, description, category,
                   default_price_cents, duration_minutes, is_standard
            FROM procedure_catalog
            ORDER BY name
            "#,
        )?;
        let rows = stmt.query_map([], map_procedure_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.try_into()?);
        }
        Ok(entries)
    }

    /// List procedures in one category (case-insensitive).
    pub fn list_procedure_entries_by_category(
        &self,
        category: &str,
    ) -> DbResult<Vec<ProcedureCatalogEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, code, description, category,
                   default_price_cents, duration_minutes, is_standard
            FROM procedure_catalog
            WHERE lower(category) = lower(?)
            ORDER BY name
            "#,
        )?;
        let rows = stmt.query_map([category.trim()], map_procedure_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.try_into()?);
        }
        Ok(entries)
    }

    /// Search procedures by name, code or description, best match first.
    pub fn search_procedure_entries(
        &self,
        query: &str,
        limit: usize,
    ) -> DbResult<Vec<ProcedureCatalogEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, code, description, category,
                   default_price_cents, duration_minutes, is_standard
            FROM procedure_catalog
            WHERE name LIKE ?1 ESCAPE '\' OR code LIKE ?1 ESCAPE '\' OR description LIKE ?1 ESCAPE '\'
            "#,
        )?;
        let rows = stmt.query_map([like_pattern(query)], map_procedure_row)?;

        let mut entries: Vec<ProcedureCatalogEntry> = Vec::new();
        for row in rows {
            entries.push(row?.try_into()?);
        }
        Ok(rank_by_name(query, entries, |e| e.name.as_str(), limit))
    }

    // =========================================================================
    // Standard catalogs
    // =========================================================================

    /// Load the standard condition and procedure catalogs.
    ///
    /// Existing entries with the same IDs are overwritten.
    pub fn seed_standard_catalogs(&self) -> DbResult<()> {
        for entry in standard_conditions() {
            self.upsert_condition_entry(&entry)?;
        }
        for entry in standard_procedures()? {
            self.upsert_procedure_entry(&entry)?;
        }
        Ok(())
    }
}

fn map_condition_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConditionCatalogEntry> {
    Ok(ConditionCatalogEntry {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        description: row.get(3)?,
        color_code: row.get(4)?,
        icon: row.get(5)?,
        is_standard: row.get(6)?,
    })
}

fn map_procedure_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProcedureEntryRow> {
    Ok(ProcedureEntryRow {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        description: row.get(3)?,
        category: row.get(4)?,
        default_price_cents: row.get(5)?,
        duration_minutes: row.get(6)?,
        is_standard: row.get(7)?,
    })
}

/// Intermediate row struct for database mapping.
struct ProcedureEntryRow {
    id: i64,
    name: String,
    code: String,
    description: String,
    category: String,
    default_price_cents: i64,
    duration_minutes: u32,
    is_standard: bool,
}

impl TryFrom<ProcedureEntryRow> for ProcedureCatalogEntry {
    type Error = DbError;

    fn try_from(row: ProcedureEntryRow) -> Result<Self, Self::Error> {
        let default_price = Price::from_cents(row.default_price_cents).ok_or_else(|| {
            DbError::Constraint(format!("Negative default price on procedure {}", row.id))
        })?;
        Ok(ProcedureCatalogEntry {
            id: row.id,
            name: row.name,
            code: row.code,
            description: row.description,
            category: row.category,
            default_price,
            duration_minutes: row.duration_minutes,
            is_standard: row.is_standard,
        })
    }
}

/// Build a `LIKE` substring pattern, escaping the wildcard characters.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Order matches by similarity of their name to the query.
fn rank_by_name<T>(query: &str, entries: Vec<T>, name: impl Fn(&T) -> &str, limit: usize) -> Vec<T> {
    let query = query.trim().to_lowercase();
    let mut scored: Vec<(f64, T)> = entries
        .into_iter()
        .map(|e| (fuzzy_match(&query, &name(&e).to_lowercase()), e))
        .collect();
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| name(&a.1).cmp(name(&b.1)))
    });
    scored.into_iter().take(limit).map(|(_, e)| e).collect()
}

/// Fuzzy similarity blending Jaro-Winkler and normalized Levenshtein.
fn fuzzy_match(a: &str, b: &str) -> f64 {
    jaro_winkler(a, b) * 0.6 + normalized_levenshtein(a, b) * 0.4
}

fn standard_conditions() -> Vec<ConditionCatalogEntry> {
    [
        ("Cavity", "C01", "Tooth decay or cavity", "#FF0000", "cavity-icon"),
        ("Fracture", "F01", "Tooth fracture or crack", "#FFA500", "fracture-icon"),
        ("Missing", "M01", "Missing tooth", "#000000", "missing-icon"),
        ("Impacted", "I01", "Impacted tooth", "#800080", "impacted-icon"),
        ("Root Canal", "RC01", "Root canal treated tooth", "#0000FF", "root-canal-icon"),
        ("Crown", "CR01", "Tooth with crown", "#FFD700", "crown-icon"),
        ("Bridge", "BR01", "Bridge abutment tooth", "#A52A2A", "bridge-icon"),
        ("Implant", "IM01", "Dental implant", "#808080", "implant-icon"),
        ("Veneer", "V01", "Tooth with veneer", "#FFFFFF", "veneer-icon"),
        ("Gingivitis", "G01", "Gum inflammation", "#FF69B4", "gingivitis-icon"),
    ]
    .into_iter()
    .zip(1..)
    .map(|((name, code, description, color, icon), id)| ConditionCatalogEntry {
        id,
        name: name.into(),
        code: code.into(),
        description: description.into(),
        color_code: Some(color.into()),
        icon: Some(icon.into()),
        is_standard: true,
    })
    .collect()
}

fn standard_procedures() -> DbResult<Vec<ProcedureCatalogEntry>> {
    [
        ("Amalgam Filling (1 surface)", "D2140", "Silver filling for posterior teeth (1 surface)", "restorative", 12000, 30),
        ("Composite Filling (1 surface)", "D2330", "Tooth-colored filling for anterior teeth (1 surface)", "restorative", 15000, 30),
        ("Composite Filling (2 surfaces)", "D2331", "Tooth-colored filling for anterior teeth (2 surfaces)", "restorative", 18000, 45),
        ("Root Canal - Anterior", "D3310", "Root canal therapy for anterior tooth", "endodontic", 70000, 60),
        ("Root Canal - Premolar", "D3320", "Root canal therapy for premolar tooth", "endodontic", 80000, 75),
        ("Root Canal - Molar", "D3330", "Root canal therapy for molar tooth", "endodontic", 100000, 90),
        ("Extraction - Simple", "D7140", "Simple extraction of erupted tooth", "oral surgery", 15000, 30),
        ("Extraction - Surgical", "D7210", "Surgical extraction of erupted tooth", "oral surgery", 25000, 45),
        ("Crown - Porcelain/Ceramic", "D2740", "Porcelain/ceramic crown", "prosthodontic", 120000, 60),
        ("Scaling and Root Planing (per quadrant)", "D4341", "Deep cleaning for periodontal disease", "periodontic", 20000, 45),
    ]
    .into_iter()
    .zip(1..)
    .map(|((name, code, description, category, cents, minutes), id)| {
        let default_price = Price::from_cents(cents)
            .ok_or_else(|| DbError::Constraint(format!("Negative seed price for {}", code)))?;
        Ok(ProcedureCatalogEntry {
            id,
            name: name.into(),
            code: code.into(),
            description: description.into(),
            category: category.into(),
            default_price,
            duration_minutes: minutes,
            is_standard: true,
        })
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.seed_standard_catalogs().unwrap();
        db
    }

    #[test]
    fn test_seed_standard_catalogs() {
        let db = setup_db();

        assert_eq!(db.list_condition_entries().unwrap().len(), 10);
        assert_eq!(db.list_procedure_entries().unwrap().len(), 10);

        let cavity = db.get_condition_entry(1).unwrap().unwrap();
        assert_eq!(cavity.code, "C01");
        assert_eq!(cavity.color_code.as_deref(), Some("#FF0000"));

        let composite = db.get_procedure_entry(3).unwrap().unwrap();
        assert_eq!(composite.code, "D2331");
        assert_eq!(composite.default_price.to_string(), "180.00");
    }

    #[test]
    fn test_seed_is_repeatable() {
        let db = setup_db();
        db.seed_standard_catalogs().unwrap();
        assert_eq!(db.list_condition_entries().unwrap().len(), 10);
    }

    #[test]
    fn test_upsert_updates() {
        let db = setup_db();

        let mut entry = db.get_procedure_entry(1).unwrap().unwrap();
        entry.default_price = Price::parse("135").unwrap();
        db.upsert_procedure_entry(&entry).unwrap();

        let retrieved = db.get_procedure_entry(1).unwrap().unwrap();
        assert_eq!(retrieved.default_price.cents(), 13500);
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let db = setup_db();
        let clash = ConditionCatalogEntry::new(99, "Decay".into(), "C01".into());
        assert!(db.upsert_condition_entry(&clash).is_err());
    }

    #[test]
    fn test_search_ranks_by_name() {
        let db = setup_db();

        let results = db.search_procedure_entries("root canal", 10).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.name.starts_with("Root Canal")));

        let results = db.search_procedure_entries("extraction", 1).unwrap();
        assert_eq!(results.len(), 1);

        let results = db.search_condition_entries("gum", 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Gingivitis");

        assert!(db.search_condition_entries("zzz", 10).unwrap().is_empty());
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let db = setup_db();
        assert!(db.search_condition_entries("%", 10).unwrap().is_empty());
    }

    #[test]
    fn test_list_by_category() {
        let db = setup_db();

        let surgical = db.list_procedure_entries_by_category("Oral Surgery").unwrap();
        let codes: Vec<_> = surgical.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["D7140", "D7210"]);
    }
}
