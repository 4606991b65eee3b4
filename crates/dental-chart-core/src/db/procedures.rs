//! Tooth and general procedure database operations.

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension};

use super::{
    actor_columns, actor_from_columns, parse_surfaces, reference_columns, Database, DbError,
    DbResult, ReferenceRow,
};
use crate::models::{Price, ProcedureStatus, ProgressNote, ToothProcedure};

const SELECT_PROCEDURE: &str = r#"
    SELECT tp.id, tp.patient_id, tp.tooth_number,
           tp.catalog_procedure_id, pc.name, pc.code,
           tp.custom_name, tp.custom_code, tp.custom_description,
           tp.surface, tp.status, tp.price_cents, tp.date_performed,
           tp.performed_by, tp.performed_by_name, tp.notes,
           tp.created_at, tp.updated_at
    FROM tooth_procedures tp
    LEFT JOIN procedure_catalog pc ON pc.id = tp.catalog_procedure_id
"#;

impl Database {
    /// Insert a new procedure. Progress notes are stored separately.
    pub fn insert_procedure(&self, procedure: &ToothProcedure) -> DbResult<()> {
        let (catalog_id, custom_name, custom_code, custom_description) =
            reference_columns(&procedure.reference);
        let (performed_by, performed_by_name) = split_optional_actor(procedure);

        self.conn.execute(
            r#"
            INSERT INTO tooth_procedures (
                id, patient_id, tooth_number, catalog_procedure_id,
                custom_name, custom_code, custom_description,
                surface, status, price_cents, date_performed,
                performed_by, performed_by_name, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                procedure.id,
                procedure.patient_id,
                procedure.tooth_number,
                catalog_id,
                custom_name,
                custom_code,
                custom_description,
                procedure.surfaces.to_wire(),
                procedure.status.as_str(),
                procedure.price.map(|p| p.cents()),
                procedure.date_performed,
                performed_by,
                performed_by_name,
                procedure.notes,
                procedure.created_at,
            ],
        )?;
        Ok(())
    }

    /// Write the mutable fields of an existing procedure.
    pub fn update_procedure(&self, procedure: &ToothProcedure) -> DbResult<bool> {
        let (performed_by, performed_by_name) = split_optional_actor(procedure);

        let rows_affected = self.conn.execute(
            r#"
            UPDATE tooth_procedures SET
                surface = ?3,
                status = ?4,
                price_cents = ?5,
                date_performed = ?6,
                performed_by = ?7,
                performed_by_name = ?8,
                notes = ?9,
                updated_at = ?10
            WHERE id = ?1 AND patient_id = ?2
            "#,
            params![
                procedure.id,
                procedure.patient_id,
                procedure.surfaces.to_wire(),
                procedure.status.as_str(),
                procedure.price.map(|p| p.cents()),
                procedure.date_performed,
                performed_by,
                performed_by_name,
                procedure.notes,
                procedure.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get a procedure on a patient's chart, with its progress notes.
    pub fn get_procedure(&self, patient_id: &str, id: &str) -> DbResult<Option<ToothProcedure>> {
        let sql = format!("{} WHERE tp.patient_id = ?1 AND tp.id = ?2", SELECT_PROCEDURE);
        let row = self
            .conn
            .query_row(&sql, params![patient_id, id], map_procedure_row)
            .optional()?;

        match row {
            Some(row) => {
                let mut procedure: ToothProcedure = row.try_into()?;
                procedure.progress_notes = self.list_progress_notes(&procedure.id)?;
                Ok(Some(procedure))
            }
            None => Ok(None),
        }
    }

    /// All tooth-bound and general procedures for a patient, oldest first.
    pub fn list_procedures_for_patient(&self, patient_id: &str) -> DbResult<Vec<ToothProcedure>> {
        let sql = format!(
            "{} WHERE tp.patient_id = ?1 ORDER BY tp.created_at, tp.rowid",
            SELECT_PROCEDURE
        );
        self.query_procedures(&sql, patient_id)
    }

    /// General (whole-mouth) procedures for a patient, oldest first.
    pub fn list_general_procedures(&self, patient_id: &str) -> DbResult<Vec<ToothProcedure>> {
        let sql = format!(
            "{} WHERE tp.patient_id = ?1 AND tp.tooth_number IS NULL ORDER BY tp.created_at, tp.rowid",
            SELECT_PROCEDURE
        );
        self.query_procedures(&sql, patient_id)
    }

    /// Delete a procedure and its notes. Returns false if nothing was deleted.
    pub fn delete_procedure(&self, patient_id: &str, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM tooth_procedures WHERE patient_id = ?1 AND id = ?2",
            params![patient_id, id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Append a progress note.
    pub fn insert_progress_note(&self, note: &ProgressNote) -> DbResult<()> {
        let (created_by, created_by_name) = actor_columns(&note.created_by);
        self.conn.execute(
            r#"
            INSERT INTO procedure_notes (
                id, procedure_id, note, appointment_date,
                created_by, created_by_name, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                note.id,
                note.procedure_id,
                note.note,
                note.appointment_date,
                created_by,
                created_by_name,
                note.created_at,
            ],
        )?;
        Ok(())
    }

    /// Progress notes of one procedure, latest appointment first.
    pub fn list_progress_notes(&self, procedure_id: &str) -> DbResult<Vec<ProgressNote>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, procedure_id, note, appointment_date,
                   created_by, created_by_name, created_at
            FROM procedure_notes
            WHERE procedure_id = ?
            ORDER BY appointment_date DESC, created_at DESC, rowid DESC
            "#,
        )?;
        let rows = stmt.query_map([procedure_id], map_note_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn query_procedures(&self, sql: &str, patient_id: &str) -> DbResult<Vec<ToothProcedure>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([patient_id], map_procedure_row)?;

        let mut procedures: Vec<ToothProcedure> = Vec::new();
        for row in rows {
            procedures.push(row?.try_into()?);
        }

        let mut notes = self.notes_by_procedure(patient_id)?;
        for procedure in &mut procedures {
            procedure.progress_notes = notes.remove(&procedure.id).unwrap_or_default();
        }
        Ok(procedures)
    }

    /// All notes for a patient's procedures, grouped and ordered per procedure.
    fn notes_by_procedure(&self, patient_id: &str) -> DbResult<HashMap<String, Vec<ProgressNote>>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT n.id, n.procedure_id, n.note, n.appointment_date,
                   n.created_by, n.created_by_name, n.created_at
            FROM procedure_notes n
            JOIN tooth_procedures tp ON tp.id = n.procedure_id
            WHERE tp.patient_id = ?
            ORDER BY n.appointment_date DESC, n.created_at DESC, n.rowid DESC
            "#,
        )?;
        let rows = stmt.query_map([patient_id], map_note_row)?;

        let mut grouped: HashMap<String, Vec<ProgressNote>> = HashMap::new();
        for row in rows {
            let note = row?;
            grouped.entry(note.procedure_id.clone()).or_default().push(note);
        }
        Ok(grouped)
    }
}

fn split_optional_actor(procedure: &ToothProcedure) -> (Option<&str>, Option<&str>) {
    match &procedure.performed_by {
        Some(actor) => {
            let (id, name) = actor_columns(actor);
            (Some(id), name)
        }
        None => (None, None),
    }
}

fn map_note_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProgressNote> {
    Ok(ProgressNote {
        id: row.get(0)?,
        procedure_id: row.get(1)?,
        note: row.get(2)?,
        appointment_date: row.get(3)?,
        created_by: actor_from_columns(row.get(4)?, row.get(5)?),
        created_at: row.get(6)?,
    })
}

fn map_procedure_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProcedureRow> {
    Ok(ProcedureRow {
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
        status: row.get(10)?,
        price_cents: row.get(11)?,
        date_performed: row.get(12)?,
        performed_by: row.get(13)?,
        performed_by_name: row.get(14)?,
        notes: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

/// Intermediate row struct for database mapping.
struct ProcedureRow {
    id: String,
    patient_id: String,
    tooth_number: Option<String>,
    reference: ReferenceRow,
    surface: String,
    status: String,
    price_cents: Option<i64>,
    date_performed: String,
    performed_by: Option<String>,
    performed_by_name: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: Option<String>,
}

impl TryFrom<ProcedureRow> for ToothProcedure {
    type Error = DbError;

    fn try_from(row: ProcedureRow) -> Result<Self, Self::Error> {
        let status = ProcedureStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown procedure status: {}", row.status)))?;
        let price = row
            .price_cents
            .map(|cents| {
                Price::from_cents(cents)
                    .ok_or_else(|| DbError::Constraint(format!("Negative price on {}", row.id)))
            })
            .transpose()?;

        Ok(ToothProcedure {
            id: row.id,
            patient_id: row.patient_id,
            tooth_number: row.tooth_number,
            reference: row.reference.try_into()?,
            surfaces: parse_surfaces(&row.surface)?,
            status,
            price,
            date_performed: row.date_performed,
            performed_by: row
                .performed_by
                .map(|id| actor_from_columns(id, row.performed_by_name)),
            notes: row.notes,
            progress_notes: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
