//! Tooth condition database operations.

use rusqlite::{params, OptionalExtension};

use super::{
    actor_columns, actor_from_columns, parse_surfaces, reference_columns, Database, DbError,
    DbResult, ReferenceRow,
};
use crate::models::{Severity, ToothCondition};

const SELECT_CONDITION: &str = r#"
    SELECT tc.id, tc.patient_id, tc.tooth_number,
           tc.catalog_condition_id, cc.name, cc.code,
           tc.custom_name, tc.custom_code, tc.custom_description,
           tc.surface, tc.severity, tc.notes,
           tc.created_by, tc.created_by_name, tc.created_at,
           tc.updated_by, tc.updated_by_name, tc.updated_at
    FROM tooth_conditions tc
    LEFT JOIN condition_catalog cc ON cc.id = tc.catalog_condition_id
"#;

impl Database {
    /// Insert a new tooth condition.
    pub fn insert_condition(&self, condition: &ToothCondition) -> DbResult<()> {
        let (catalog_id, custom_name, custom_code, custom_description) =
            reference_columns(&condition.reference);
        let (created_by, created_by_name) = actor_columns(&condition.created_by);

        self.conn.execute(
            r#"
            INSERT INTO tooth_conditions (
                id, patient_id, tooth_number, catalog_condition_id,
                custom_name, custom_code, custom_description,
                surface, severity, notes,
                created_by, created_by_name, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
            params![
                condition.id,
                condition.patient_id,
                condition.tooth_number,
                catalog_id,
                custom_name,
                custom_code,
                custom_description,
                condition.surfaces.to_wire(),
                condition.severity.map(|s| s.as_str()),
                condition.notes,
                created_by,
                created_by_name,
                condition.created_at,
            ],
        )?;
        Ok(())
    }

    /// Write the mutable fields of an existing condition.
    pub fn update_condition(&self, condition: &ToothCondition) -> DbResult<bool> {
        let (updated_by, updated_by_name) = match &condition.updated_by {
            Some(actor) => {
                let (id, name) = actor_columns(actor);
                (Some(id), name)
            }
            None => (None, None),
        };

        let rows_affected = self.conn.execute(
            r#"
            UPDATE tooth_conditions SET
                surface = ?3,
                severity = ?4,
                notes = ?5,
                updated_by = ?6,
                updated_by_name = ?7,
                updated_at = ?8
            WHERE id = ?1 AND patient_id = ?2
            "#,
            params![
                condition.id,
                condition.patient_id,
                condition.surfaces.to_wire(),
                condition.severity.map(|s| s.as_str()),
                condition.notes,
                updated_by,
                updated_by_name,
                condition.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a condition on a patient's chart.
    pub fn get_condition(&self, patient_id: &str, id: &str) -> DbResult<Option<ToothCondition>> {
        let sql = format!("{} WHERE tc.patient_id = ?1 AND tc.id = ?2", SELECT_CONDITION);
        let result = self
            .conn
            .query_row(&sql, params![patient_id, id], map_condition_row)
            .optional()?;

        result.map(|row| row.try_into()).transpose()
    }

    /// All conditions on a patient's chart, oldest first.
    pub fn list_conditions_for_patient(&self, patient_id: &str) -> DbResult<Vec<ToothCondition>> {
        let sql = format!(
            "{} WHERE tc.patient_id = ?1 ORDER BY tc.created_at, tc.rowid",
            SELECT_CONDITION
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([patient_id], map_condition_row)?;

        let mut conditions = Vec::new();
        for row in rows {
            conditions.push(row?.try_into()?);
        }
        Ok(conditions)
    }

    /// Delete a condition. Returns false if nothing was deleted.
    pub fn delete_condition(&self, patient_id: &str, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM tooth_conditions WHERE patient_id = ?1 AND id = ?2",
            params![patient_id, id],
        )?;
        Ok(rows_affected > 0)
    }
}

fn map_condition_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConditionRow> {
    Ok(ConditionRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        tooth_number: row.get(2)?,
        reference: ReferenceRow {
            catalog_id: row.get(3)?,
            catalog_name: row.get(4)?,
            catalog_code: row.get(5)?,
            custom_name: row.get(6)?,
            custom_code: row.get(7)?,
            custom_description: row.get(8)?,
        },
        surface: row.get(9)?,
        severity: row.get(10)?,
        notes: row.get(11)?,
        created_by: row.get(12)?,
        created_by_name: row.get(13)?,
        created_at: row.get(14)?,
        updated_by: row.get(15)?,
        updated_by_name: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

/// Intermediate row struct for database mapping.
struct ConditionRow {
    id: String,
    patient_id: String,
    tooth_number: String,
    reference: ReferenceRow,
    surface: String,
    severity: Option<String>,
    notes: Option<String>,
    created_by: String,
    created_by_name: Option<String>,
    created_at: String,
    updated_by: Option<String>,
    updated_by_name: Option<String>,
    updated_at: Option<String>,
}

impl TryFrom<ConditionRow> for ToothCondition {
    type Error = DbError;

    fn try_from(row: ConditionRow) -> Result<Self, Self::Error> {
        let severity = row
            .severity
            .map(|s| {
                Severity::parse(&s)
                    .ok_or_else(|| DbError::Constraint(format!("Unknown severity: {}", s)))
            })
            .transpose()?;

        Ok(ToothCondition {
            id: row.id,
            patient_id: row.patient_id,
            tooth_number: row.tooth_number,
            reference: row.reference.try_into()?,
            surfaces: parse_surfaces(&row.surface)?,
            severity,
            notes: row.notes,
            created_by: actor_from_columns(row.created_by, row.created_by_name),
            created_at: row.created_at,
            updated_by: row
                .updated_by
                .map(|id| actor_from_columns(id, row.updated_by_name)),
            updated_at: row.updated_at,
        })
    }
}
