//! Patient database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::Patient;

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO patients (patient_id, clinic_id, name, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                patient.patient_id,
                patient.clinic_id,
                patient.name,
                patient.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, patient_id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                r#"
                SELECT patient_id, clinic_id, name, created_at
                FROM patients
                WHERE patient_id = ?
                "#,
                [patient_id],
                |row| {
                    Ok(Patient {
                        patient_id: row.get(0)?,
                        clinic_id: row.get(1)?,
                        name: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// List patients belonging to a clinic.
    pub fn list_patients_for_clinic(&self, clinic_id: &str) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT patient_id, clinic_id, name, created_at
            FROM patients
            WHERE clinic_id = ?
            ORDER BY name
            "#,
        )?;

        let rows = stmt.query_map([clinic_id], |row| {
            Ok(Patient {
                patient_id: row.get(0)?,
                clinic_id: row.get(1)?,
                name: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
