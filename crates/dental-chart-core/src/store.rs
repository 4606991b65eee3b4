//! Current chart state: conditions and procedures attached to teeth.
//!
//! The store applies already-validated changes. It reports the failures it
//! alone can detect (missing rows, illegal status transitions) and never
//! touches history; [`crate::service::MutationService`] pairs every store
//! write with exactly one history entry inside one transaction.

use std::collections::HashMap;

use crate::db::Database;
use crate::error::{ChartError, ChartResult};
use crate::models::{
    now_timestamp, ActorRef, ChartTooth, DentalChart, DentitionType, EntryReference, Patient,
    Price, ProcedureStatus, ProgressNote, Severity, SurfaceSet, Tooth, ToothCondition,
    ToothProcedure,
};
use crate::registry::{normalize_tooth_identity, ToothRegistry};

/// A validated condition ready to be charted.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionDraft {
    pub reference: EntryReference,
    pub surfaces: SurfaceSet,
    pub severity: Option<Severity>,
    pub notes: Option<String>,
}

/// Validated partial update of a condition. `None` keeps the prior value;
/// `notes: Some(None)` clears the notes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionChanges {
    pub surfaces: Option<SurfaceSet>,
    pub severity: Option<Severity>,
    pub notes: Option<Option<String>>,
}

/// A validated procedure ready to be charted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureDraft {
    pub reference: EntryReference,
    pub surfaces: SurfaceSet,
    pub status: ProcedureStatus,
    pub price: Option<Price>,
    pub date_performed: String,
    pub performed_by: Option<ActorRef>,
    pub notes: Option<String>,
}

/// Validated partial update of a procedure. `None` keeps the prior value;
/// `notes: Some(None)` clears the notes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcedureChanges {
    pub surfaces: Option<SurfaceSet>,
    pub status: Option<ProcedureStatus>,
    pub price: Option<Price>,
    pub date_performed: Option<String>,
    pub performed_by: Option<ActorRef>,
    pub notes: Option<Option<String>>,
}

/// Resolve a caller-supplied tooth identity against the registry.
///
/// The dentition is always derived from the identity itself; a supplied
/// dentition only serves as a cross-check.
pub fn resolve_tooth(raw: &str, supplied: Option<DentitionType>) -> ChartResult<Tooth> {
    let identity = normalize_tooth_identity(raw);
    let implied = DentitionType::implied_by(&identity)
        .ok_or_else(|| ChartError::ToothNotFound(identity.clone()))?;
    if let Some(supplied) = supplied {
        if supplied != implied {
            return Err(ChartError::DentitionMismatch {
                tooth: identity,
                supplied: supplied.as_str(),
                implied: implied.as_str(),
            });
        }
    }
    ToothRegistry::lookup(&identity).ok_or(ChartError::ToothNotFound(identity))
}

/// Chart state store for tooth-bound conditions and procedures.
pub struct ChartStore<'a> {
    db: &'a Database,
}

impl<'a> ChartStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // =========================================================================
    // Conditions
    // =========================================================================

    pub fn add_condition(
        &self,
        patient_id: &str,
        tooth: &Tooth,
        draft: ConditionDraft,
        actor: &ActorRef,
    ) -> ChartResult<ToothCondition> {
        let condition = ToothCondition {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: patient_id.to_string(),
            tooth_number: tooth.number.clone(),
            reference: draft.reference,
            surfaces: draft.surfaces,
            severity: draft.severity,
            notes: draft.notes,
            created_by: actor.clone(),
            created_at: now_timestamp(),
            updated_by: None,
            updated_at: None,
        };
        self.db.insert_condition(&condition)?;
        // Re-read so catalog name and code are the stored ones.
        self.condition_on_tooth(patient_id, &condition.tooth_number, &condition.id)
    }

    /// A condition, provided it sits on the given tooth.
    pub fn condition_on_tooth(
        &self,
        patient_id: &str,
        tooth_number: &str,
        condition_id: &str,
    ) -> ChartResult<ToothCondition> {
        self.db
            .get_condition(patient_id, condition_id)?
            .filter(|c| c.tooth_number == tooth_number)
            .ok_or_else(|| ChartError::ConditionNotFound(condition_id.to_string()))
    }

    /// Apply a partial update. Returns the condition before and after.
    pub fn update_condition(
        &self,
        patient_id: &str,
        tooth_number: &str,
        condition_id: &str,
        changes: ConditionChanges,
        actor: &ActorRef,
    ) -> ChartResult<(ToothCondition, ToothCondition)> {
        let before = self.condition_on_tooth(patient_id, tooth_number, condition_id)?;
        let mut after = before.clone();
        if let Some(surfaces) = changes.surfaces {
            after.surfaces = surfaces;
        }
        if let Some(severity) = changes.severity {
            after.severity = Some(severity);
        }
        if let Some(notes) = changes.notes {
            after.notes = notes;
        }
        after.updated_by = Some(actor.clone());
        after.updated_at = Some(now_timestamp());

        if !self.db.update_condition(&after)? {
            return Err(ChartError::ConditionNotFound(condition_id.to_string()));
        }
        Ok((before, after))
    }

    /// Remove a condition. A second delete of the same ID fails.
    pub fn delete_condition(
        &self,
        patient_id: &str,
        tooth_number: &str,
        condition_id: &str,
    ) -> ChartResult<ToothCondition> {
        let removed = self.condition_on_tooth(patient_id, tooth_number, condition_id)?;
        if !self.db.delete_condition(patient_id, condition_id)? {
            return Err(ChartError::ConditionNotFound(condition_id.to_string()));
        }
        Ok(removed)
    }

    // =========================================================================
    // Procedures
    // =========================================================================

    pub fn add_procedure(
        &self,
        patient_id: &str,
        tooth: &Tooth,
        draft: ProcedureDraft,
    ) -> ChartResult<ToothProcedure> {
        insert_procedure(self.db, patient_id, Some(&tooth.number), draft)
    }

    /// A procedure, provided it sits on the given tooth.
    pub fn procedure_on_tooth(
        &self,
        patient_id: &str,
        tooth_number: &str,
        procedure_id: &str,
    ) -> ChartResult<ToothProcedure> {
        self.db
            .get_procedure(patient_id, procedure_id)?
            .filter(|p| p.tooth_number.as_deref() == Some(tooth_number))
            .ok_or_else(|| ChartError::ProcedureNotFound(procedure_id.to_string()))
    }

    /// Apply a partial update, enforcing the status lifecycle.
    pub fn update_procedure(
        &self,
        patient_id: &str,
        tooth_number: &str,
        procedure_id: &str,
        changes: ProcedureChanges,
    ) -> ChartResult<(ToothProcedure, ToothProcedure)> {
        let before = self.procedure_on_tooth(patient_id, tooth_number, procedure_id)?;
        write_procedure_changes(self.db, before, changes)
    }

    pub fn delete_procedure(
        &self,
        patient_id: &str,
        tooth_number: &str,
        procedure_id: &str,
    ) -> ChartResult<ToothProcedure> {
        let removed = self.procedure_on_tooth(patient_id, tooth_number, procedure_id)?;
        remove_procedure(self.db, removed)
    }

    /// Append a progress note to any procedure of the patient, tooth-bound
    /// or general. Returns the owning procedure and the note.
    pub fn add_progress_note(
        &self,
        patient_id: &str,
        procedure_id: &str,
        note: String,
        appointment_date: String,
        actor: &ActorRef,
    ) -> ChartResult<(ToothProcedure, ProgressNote)> {
        let procedure = self
            .db
            .get_procedure(patient_id, procedure_id)?
            .ok_or_else(|| ChartError::ProcedureNotFound(procedure_id.to_string()))?;
        let note = ProgressNote {
            id: uuid::Uuid::new_v4().to_string(),
            procedure_id: procedure.id.clone(),
            note,
            appointment_date,
            created_by: actor.clone(),
            created_at: now_timestamp(),
        };
        self.db.insert_progress_note(&note)?;
        Ok((procedure, note))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Assemble the full chart. Pure read.
    pub fn get_chart(&self, patient: &Patient) -> ChartResult<DentalChart> {
        let mut conditions: HashMap<String, Vec<ToothCondition>> = HashMap::new();
        for condition in self.db.list_conditions_for_patient(&patient.patient_id)? {
            conditions
                .entry(condition.tooth_number.clone())
                .or_default()
                .push(condition);
        }

        let mut procedures: HashMap<String, Vec<ToothProcedure>> = HashMap::new();
        let mut general_procedures = Vec::new();
        for procedure in self.db.list_procedures_for_patient(&patient.patient_id)? {
            match procedure.tooth_number.clone() {
                Some(number) => procedures.entry(number).or_default().push(procedure),
                None => general_procedures.push(procedure),
            }
        }

        let mut populate = |dentition: DentitionType| -> Vec<ChartTooth> {
            ToothRegistry::teeth_for(dentition)
                .into_iter()
                .map(|tooth| ChartTooth {
                    conditions: conditions.remove(&tooth.number).unwrap_or_default(),
                    procedures: procedures.remove(&tooth.number).unwrap_or_default(),
                    tooth,
                })
                .collect()
        };
        let permanent_teeth = populate(DentitionType::Permanent);
        let primary_teeth = populate(DentitionType::Primary);

        Ok(DentalChart {
            patient_id: patient.patient_id.clone(),
            patient_name: patient.name.clone(),
            last_updated: self.db.latest_history_timestamp(&patient.patient_id)?,
            permanent_teeth,
            primary_teeth,
            general_procedures,
        })
    }
}

/// Insert a procedure and read it back with catalog fields filled in.
pub(crate) fn insert_procedure(
    db: &Database,
    patient_id: &str,
    tooth_number: Option<&str>,
    draft: ProcedureDraft,
) -> ChartResult<ToothProcedure> {
    let procedure = ToothProcedure {
        id: uuid::Uuid::new_v4().to_string(),
        patient_id: patient_id.to_string(),
        tooth_number: tooth_number.map(String::from),
        reference: draft.reference,
        surfaces: draft.surfaces,
        status: draft.status,
        price: draft.price,
        date_performed: draft.date_performed,
        performed_by: draft.performed_by,
        notes: draft.notes,
        progress_notes: Vec::new(),
        created_at: now_timestamp(),
        updated_at: None,
    };
    db.insert_procedure(&procedure)?;
    db.get_procedure(patient_id, &procedure.id)?
        .ok_or(ChartError::ProcedureNotFound(procedure.id))
}

/// Merge changes into a procedure and persist it.
pub(crate) fn write_procedure_changes(
    db: &Database,
    before: ToothProcedure,
    changes: ProcedureChanges,
) -> ChartResult<(ToothProcedure, ToothProcedure)> {
    let mut after = before.clone();
    if let Some(status) = changes.status {
        after.status = before.status.transition(status)?;
    }
    if let Some(surfaces) = changes.surfaces {
        after.surfaces = surfaces;
    }
    if let Some(price) = changes.price {
        after.price = Some(price);
    }
    if let Some(date) = changes.date_performed {
        after.date_performed = date;
    }
    if let Some(actor) = changes.performed_by {
        after.performed_by = Some(actor);
    }
    if let Some(notes) = changes.notes {
        after.notes = notes;
    }
    after.updated_at = Some(now_timestamp());

    if !db.update_procedure(&after)? {
        return Err(ChartError::ProcedureNotFound(after.id));
    }
    Ok((before, after))
}

pub(crate) fn remove_procedure(db: &Database, removed: ToothProcedure) -> ChartResult<ToothProcedure> {
    if !db.delete_procedure(&removed.patient_id, &removed.id)? {
        return Err(ChartError::ProcedureNotFound(removed.id));
    }
    Ok(removed)
}
