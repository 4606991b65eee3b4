//! Procedures charted against the patient rather than a tooth.

use crate::db::Database;
use crate::error::{ChartError, ChartResult};
use crate::models::ToothProcedure;
use crate::store::{insert_procedure, remove_procedure, write_procedure_changes, ProcedureChanges, ProcedureDraft};

/// Patient-level procedure ledger. Entries never carry a tooth number.
pub struct GeneralProcedureLedger<'a> {
    db: &'a Database,
}

impl<'a> GeneralProcedureLedger<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn add(&self, patient_id: &str, draft: ProcedureDraft) -> ChartResult<ToothProcedure> {
        insert_procedure(self.db, patient_id, None, draft)
    }

    /// A general procedure by ID. Tooth-bound procedures are not found here.
    pub fn get(&self, patient_id: &str, procedure_id: &str) -> ChartResult<ToothProcedure> {
        self.db
            .get_procedure(patient_id, procedure_id)?
            .filter(ToothProcedure::is_general)
            .ok_or_else(|| ChartError::ProcedureNotFound(procedure_id.to_string()))
    }

    pub fn update(
        &self,
        patient_id: &str,
        procedure_id: &str,
        changes: ProcedureChanges,
    ) -> ChartResult<(ToothProcedure, ToothProcedure)> {
        let before = self.get(patient_id, procedure_id)?;
        write_procedure_changes(self.db, before, changes)
    }

    pub fn delete(&self, patient_id: &str, procedure_id: &str) -> ChartResult<ToothProcedure> {
        let removed = self.get(patient_id, procedure_id)?;
        remove_procedure(self.db, removed)
    }

    /// General procedures in charting order.
    pub fn list(&self, patient_id: &str) -> ChartResult<Vec<ToothProcedure>> {
        Ok(self.db.list_general_procedures(patient_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntryReference, Patient, Price, ProcedureStatus, SurfaceSet};
    use crate::store::{resolve_tooth, ChartStore};

    fn setup_db() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        db.seed_standard_catalogs().unwrap();
        let patient = Patient::new("clinic-1".into(), "Jane Doe".into());
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    fn cleaning() -> ProcedureDraft {
        ProcedureDraft {
            reference: EntryReference::Custom {
                name: "Full Mouth Debridement".into(),
                code: "CUST-00AA11".into(),
                description: None,
            },
            surfaces: SurfaceSet::All,
            status: ProcedureStatus::Completed,
            price: Price::parse("95.00"),
            date_performed: "2024-05-02".into(),
            performed_by: None,
            notes: None,
        }
    }

    #[test]
    fn test_add_general_procedure() {
        let (db, patient) = setup_db();
        let ledger = GeneralProcedureLedger::new(&db);

        let procedure = ledger.add(&patient.patient_id, cleaning()).unwrap();
        assert!(procedure.is_general());
        assert_eq!(ledger.list(&patient.patient_id).unwrap().len(), 1);
    }

    #[test]
    fn test_tooth_procedures_hidden_from_ledger() {
        let (db, patient) = setup_db();
        let ledger = GeneralProcedureLedger::new(&db);
        let store = ChartStore::new(&db);
        let tooth = resolve_tooth("14", None).unwrap();
        let mut draft = cleaning();
        draft.status = ProcedureStatus::Planned;
        let bound = store.add_procedure(&patient.patient_id, &tooth, draft).unwrap();

        assert!(matches!(
            ledger.delete(&patient.patient_id, &bound.id),
            Err(ChartError::ProcedureNotFound(_))
        ));
        assert!(ledger.list(&patient.patient_id).unwrap().is_empty());
    }

    #[test]
    fn test_completed_general_procedure_is_terminal() {
        let (db, patient) = setup_db();
        let ledger = GeneralProcedureLedger::new(&db);
        let procedure = ledger.add(&patient.patient_id, cleaning()).unwrap();

        let reopen = ProcedureChanges {
            status: Some(ProcedureStatus::Planned),
            ..Default::default()
        };
        let err = ledger
            .update(&patient.patient_id, &procedure.id, reopen)
            .unwrap_err();
        assert!(matches!(err, ChartError::InvalidStatusTransition(_)));
    }

    #[test]
    fn test_delete_twice_fails() {
        let (db, patient) = setup_db();
        let ledger = GeneralProcedureLedger::new(&db);
        let procedure = ledger.add(&patient.patient_id, cleaning()).unwrap();

        ledger.delete(&patient.patient_id, &procedure.id).unwrap();
        assert!(matches!(
            ledger.delete(&patient.patient_id, &procedure.id),
            Err(ChartError::ProcedureNotFound(_))
        ));
    }
}
