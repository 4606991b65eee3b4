//! Validated, audited chart mutations.
//!
//! Every call follows the same shape: validate without side effects, then
//! apply the state change and append exactly one history entry inside one
//! transaction. A failed append rolls the state change back.

use serde_json::Value;

use crate::audit::AuditLog;
use crate::config::ChartConfig;
use crate::db::Database;
use crate::error::{ChartError, ChartResult};
use crate::ledger::GeneralProcedureLedger;
use crate::models::{
    normalize_appointment, parse_date, ChartContext, ChartHistoryEntry, DentitionType,
    EntryReference, HistoryAction, NewHistoryEntry, Patient, Price, ProcedureStatus,
    ProgressNote, Severity, SurfaceSet, ToothCondition, ToothProcedure,
};
use crate::store::{
    resolve_tooth, ChartStore, ConditionChanges, ConditionDraft, ProcedureChanges, ProcedureDraft,
};

use super::access::{authorize_patient, ClinicAccess};
use super::requests::{
    non_blank, notes_change, AddConditionRequest, AddGeneralProcedureRequest, AddNoteRequest,
    AddProcedureRequest, ConditionPatch, EntrySelection, ProcedurePatch,
};

/// A state change paired with the history it must be recorded under.
struct Change<T> {
    value: T,
    tooth_number: Option<String>,
    details: Value,
}

/// Entry point for every chart write.
pub struct MutationService<'a> {
    db: &'a Database,
    config: &'a ChartConfig,
    access: &'a dyn ClinicAccess,
}

impl<'a> MutationService<'a> {
    pub fn new(db: &'a Database, config: &'a ChartConfig, access: &'a dyn ClinicAccess) -> Self {
        Self { db, config, access }
    }

    // =========================================================================
    // Patients
    // =========================================================================

    /// Register a patient in the context's clinic. Not a chart mutation, so
    /// no history is recorded.
    pub fn register_patient(&self, ctx: &ChartContext, name: &str) -> ChartResult<Patient> {
        self.access.authorize(ctx).map_err(ChartError::Unauthorized)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ChartError::invalid("name", "patient name is required"));
        }
        let patient = Patient::new(ctx.clinic_id.clone(), name.to_string());
        self.db.insert_patient(&patient)?;
        tracing::info!(patient_id = %patient.patient_id, clinic_id = %patient.clinic_id, "patient registered");
        Ok(patient)
    }

    // =========================================================================
    // Conditions
    // =========================================================================

    pub fn add_condition(
        &self,
        ctx: &ChartContext,
        patient_id: &str,
        request: AddConditionRequest,
    ) -> ChartResult<ToothCondition> {
        let patient = authorize_patient(self.db, self.access, ctx, patient_id)?;
        let tooth = resolve_tooth(
            &request.tooth_number,
            parse_dentition(request.dentition_type.as_deref())?,
        )?;
        let draft = ConditionDraft {
            reference: self.condition_reference(request.entry)?,
            surfaces: SurfaceSet::parse(&request.surface)?,
            severity: parse_severity(request.severity.as_deref())?,
            notes: non_blank(request.notes),
        };

        self.run_atomic(ctx, &patient.patient_id, HistoryAction::AddCondition, || {
            let condition = ChartStore::new(self.db).add_condition(
                &patient.patient_id,
                &tooth,
                draft.clone(),
                &ctx.actor,
            )?;
            Ok(Change {
                tooth_number: Some(condition.tooth_number.clone()),
                details: condition.history_details(),
                value: condition,
            })
        })
    }

    pub fn update_condition(
        &self,
        ctx: &ChartContext,
        patient_id: &str,
        tooth_number: &str,
        condition_id: &str,
        patch: ConditionPatch,
    ) -> ChartResult<ToothCondition> {
        let patient = authorize_patient(self.db, self.access, ctx, patient_id)?;
        let tooth = resolve_tooth(tooth_number, None)?;
        let changes = ConditionChanges {
            surfaces: patch.surface.as_deref().map(SurfaceSet::parse).transpose()?,
            severity: parse_severity(patch.severity.as_deref())?,
            notes: notes_change(patch.notes),
        };

        self.run_atomic(ctx, &patient.patient_id, HistoryAction::UpdateCondition, || {
            let (before, after) = ChartStore::new(self.db).update_condition(
                &patient.patient_id,
                &tooth.number,
                condition_id,
                changes.clone(),
                &ctx.actor,
            )?;
            Ok(Change {
                tooth_number: Some(after.tooth_number.clone()),
                details: with_previous(after.history_details(), before.history_details()),
                value: after,
            })
        })
    }

    /// Remove a condition. Deleting an already removed condition fails.
    pub fn delete_condition(
        &self,
        ctx: &ChartContext,
        patient_id: &str,
        tooth_number: &str,
        condition_id: &str,
    ) -> ChartResult<()> {
        let patient = authorize_patient(self.db, self.access, ctx, patient_id)?;
        let tooth = resolve_tooth(tooth_number, None)?;

        self.run_atomic(ctx, &patient.patient_id, HistoryAction::RemoveCondition, || {
            let removed = ChartStore::new(self.db).delete_condition(
                &patient.patient_id,
                &tooth.number,
                condition_id,
            )?;
            Ok(Change {
                tooth_number: Some(removed.tooth_number.clone()),
                details: removed.history_details(),
                value: (),
            })
        })
    }

    // =========================================================================
    // Tooth procedures
    // =========================================================================

    pub fn add_procedure(
        &self,
        ctx: &ChartContext,
        patient_id: &str,
        request: AddProcedureRequest,
    ) -> ChartResult<ToothProcedure> {
        let patient = authorize_patient(self.db, self.access, ctx, patient_id)?;
        let tooth = resolve_tooth(
            &request.tooth_number,
            parse_dentition(request.dentition_type.as_deref())?,
        )?;
        let (reference, default_price) = self.procedure_reference(request.entry)?;
        let draft = ProcedureDraft {
            reference,
            surfaces: SurfaceSet::parse(&request.surface)?,
            status: parse_status(request.status.as_deref())?.unwrap_or(ProcedureStatus::Planned),
            price: parse_price(request.price.as_deref())?.or(default_price),
            date_performed: parse_date_performed(&request.date_performed)?,
            performed_by: request.performed_by,
            notes: non_blank(request.notes),
        };

        self.run_atomic(ctx, &patient.patient_id, HistoryAction::AddProcedure, || {
            let procedure =
                ChartStore::new(self.db).add_procedure(&patient.patient_id, &tooth, draft.clone())?;
            Ok(Change {
                tooth_number: procedure.tooth_number.clone(),
                details: procedure.history_details(),
                value: procedure,
            })
        })
    }

    pub fn update_procedure(
        &self,
        ctx: &ChartContext,
        patient_id: &str,
        tooth_number: &str,
        procedure_id: &str,
        patch: ProcedurePatch,
    ) -> ChartResult<ToothProcedure> {
        let patient = authorize_patient(self.db, self.access, ctx, patient_id)?;
        let tooth = resolve_tooth(tooth_number, None)?;
        let changes = procedure_changes(patch)?;

        self.run_atomic(ctx, &patient.patient_id, HistoryAction::UpdateProcedure, || {
            let (before, after) = ChartStore::new(self.db).update_procedure(
                &patient.patient_id,
                &tooth.number,
                procedure_id,
                changes.clone(),
            )?;
            Ok(Change {
                tooth_number: after.tooth_number.clone(),
                details: with_previous(after.history_details(), before.history_details()),
                value: after,
            })
        })
    }

    pub fn delete_procedure(
        &self,
        ctx: &ChartContext,
        patient_id: &str,
        tooth_number: &str,
        procedure_id: &str,
    ) -> ChartResult<()> {
        let patient = authorize_patient(self.db, self.access, ctx, patient_id)?;
        let tooth = resolve_tooth(tooth_number, None)?;

        self.run_atomic(ctx, &patient.patient_id, HistoryAction::RemoveProcedure, || {
            let removed = ChartStore::new(self.db).delete_procedure(
                &patient.patient_id,
                &tooth.number,
                procedure_id,
            )?;
            Ok(Change {
                tooth_number: removed.tooth_number.clone(),
                details: removed.history_details(),
                value: (),
            })
        })
    }

    /// Append a progress note to a tooth-bound or general procedure.
    pub fn add_progress_note(
        &self,
        ctx: &ChartContext,
        patient_id: &str,
        request: AddNoteRequest,
    ) -> ChartResult<ProgressNote> {
        let patient = authorize_patient(self.db, self.access, ctx, patient_id)?;
        let note = request.note.trim().to_string();
        if note.is_empty() {
            return Err(ChartError::invalid("note", "note text is required"));
        }
        let appointment_date = normalize_appointment(&request.appointment_date).ok_or_else(|| {
            ChartError::invalid(
                "appointment_date",
                format!("unrecognized date '{}'", request.appointment_date),
            )
        })?;

        self.run_atomic(ctx, &patient.patient_id, HistoryAction::AddProcedureNote, || {
            let (procedure, note) = ChartStore::new(self.db).add_progress_note(
                &patient.patient_id,
                &request.procedure_id,
                note.clone(),
                appointment_date.clone(),
                &ctx.actor,
            )?;
            Ok(Change {
                tooth_number: procedure.tooth_number.clone(),
                details: serde_json::json!({
                    "procedure_id": procedure.id,
                    "procedure_name": procedure.reference.name(),
                    "note_id": note.id,
                    "note": note.note,
                    "appointment_date": note.appointment_date,
                }),
                value: note,
            })
        })
    }

    // =========================================================================
    // General procedures
    // =========================================================================

    pub fn add_general_procedure(
        &self,
        ctx: &ChartContext,
        patient_id: &str,
        request: AddGeneralProcedureRequest,
    ) -> ChartResult<ToothProcedure> {
        let patient = authorize_patient(self.db, self.access, ctx, patient_id)?;
        let (reference, default_price) = self.procedure_reference(request.entry)?;
        let draft = ProcedureDraft {
            reference,
            surfaces: SurfaceSet::All,
            status: parse_status(request.status.as_deref())?.unwrap_or(ProcedureStatus::Completed),
            price: parse_price(request.price.as_deref())?.or(default_price),
            date_performed: parse_date_performed(&request.date_performed)?,
            performed_by: request.performed_by,
            notes: non_blank(request.notes),
        };

        self.run_atomic(ctx, &patient.patient_id, HistoryAction::AddProcedure, || {
            let procedure = GeneralProcedureLedger::new(self.db).add(&patient.patient_id, draft.clone())?;
            Ok(Change {
                tooth_number: None,
                details: procedure.history_details(),
                value: procedure,
            })
        })
    }

    pub fn update_general_procedure(
        &self,
        ctx: &ChartContext,
        patient_id: &str,
        procedure_id: &str,
        patch: ProcedurePatch,
    ) -> ChartResult<ToothProcedure> {
        let patient = authorize_patient(self.db, self.access, ctx, patient_id)?;
        let changes = procedure_changes(patch)?;
        if changes.surfaces.as_ref().is_some_and(|s| !s.is_all()) {
            return Err(ChartError::invalid(
                "surface",
                "general procedures always cover the whole mouth",
            ));
        }

        self.run_atomic(ctx, &patient.patient_id, HistoryAction::UpdateProcedure, || {
            let (before, after) = GeneralProcedureLedger::new(self.db).update(
                &patient.patient_id,
                procedure_id,
                changes.clone(),
            )?;
            Ok(Change {
                tooth_number: None,
                details: with_previous(after.history_details(), before.history_details()),
                value: after,
            })
        })
    }

    pub fn delete_general_procedure(
        &self,
        ctx: &ChartContext,
        patient_id: &str,
        procedure_id: &str,
    ) -> ChartResult<()> {
        let patient = authorize_patient(self.db, self.access, ctx, patient_id)?;

        self.run_atomic(ctx, &patient.patient_id, HistoryAction::RemoveProcedure, || {
            let removed = GeneralProcedureLedger::new(self.db).delete(&patient.patient_id, procedure_id)?;
            Ok(Change {
                tooth_number: None,
                details: removed.history_details(),
                value: (),
            })
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Run `op` and append its history entry as one transaction.
    ///
    /// Persistence failures are retried up to the configured count; any
    /// other failure is returned at once. Every failed attempt is rolled back
    /// by dropping its transaction.
    fn run_atomic<T>(
        &self,
        ctx: &ChartContext,
        patient_id: &str,
        action: HistoryAction,
        op: impl Fn() -> ChartResult<Change<T>>,
    ) -> ChartResult<T> {
        let attempts = self.config.persistence_retries.saturating_add(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_atomic(ctx, patient_id, action, &op) {
                Ok((value, entry)) => {
                    tracing::info!(
                        patient_id,
                        action = action.as_str(),
                        tooth = entry.tooth_number.as_deref().unwrap_or("-"),
                        history_id = %entry.id,
                        "chart mutation committed"
                    );
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < attempts => {
                    tracing::warn!(
                        patient_id,
                        action = action.as_str(),
                        attempt,
                        error = %e,
                        "chart mutation rolled back, retrying"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        patient_id,
                        action = action.as_str(),
                        attempt,
                        error = %e,
                        "chart mutation rolled back"
                    );
                    return Err(e);
                }
            }
        }
    }

    fn try_atomic<T>(
        &self,
        ctx: &ChartContext,
        patient_id: &str,
        action: HistoryAction,
        op: &impl Fn() -> ChartResult<Change<T>>,
    ) -> ChartResult<(T, ChartHistoryEntry)> {
        let tx = self.db.begin()?;
        let change = op()?;
        let entry = AuditLog::new(self.db, self.config.history_page_size).append(NewHistoryEntry {
            patient_id: patient_id.to_string(),
            tooth_number: change.tooth_number,
            action,
            details: change.details,
            actor: ctx.actor.clone(),
        })?;
        tx.commit()?;
        Ok((change.value, entry))
    }

    fn condition_reference(&self, entry: EntrySelection) -> ChartResult<EntryReference> {
        match entry {
            EntrySelection::Catalog(id) => {
                let found = self
                    .db
                    .get_condition_entry(id)?
                    .ok_or(ChartError::CatalogEntryNotFound { kind: "condition", id })?;
                Ok(EntryReference::Catalog {
                    catalog_id: found.id,
                    name: found.name,
                    code: found.code,
                })
            }
            EntrySelection::Custom { name, code, description } => {
                self.custom_reference(name, code, description)
            }
        }
    }

    /// Resolve a procedure reference and the catalog's default price.
    fn procedure_reference(&self, entry: EntrySelection) -> ChartResult<(EntryReference, Option<Price>)> {
        match entry {
            EntrySelection::Catalog(id) => {
                let found = self
                    .db
                    .get_procedure_entry(id)?
                    .ok_or(ChartError::CatalogEntryNotFound { kind: "procedure", id })?;
                let reference = EntryReference::Catalog {
                    catalog_id: found.id,
                    name: found.name,
                    code: found.code,
                };
                Ok((reference, Some(found.default_price)))
            }
            EntrySelection::Custom { name, code, description } => {
                Ok((self.custom_reference(name, code, description)?, None))
            }
        }
    }

    /// Custom entries need a name; a blank or missing code is synthesized.
    fn custom_reference(
        &self,
        name: String,
        code: Option<String>,
        description: Option<String>,
    ) -> ChartResult<EntryReference> {
        let name = non_blank(Some(name))
            .ok_or_else(|| ChartError::invalid("custom_name", "custom entries need a name"))?;
        Ok(EntryReference::Custom {
            name,
            code: non_blank(code).unwrap_or_else(|| self.custom_code()),
            description: non_blank(description),
        })
    }

    /// `<prefix>-<hex>` code for custom entries, e.g. `CUST-3F9A1C`.
    fn custom_code(&self) -> String {
        let suffix: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .to_uppercase()
            .chars()
            .take(self.config.custom_code_length)
            .collect();
        format!("{}-{}", self.config.custom_code_prefix, suffix)
    }
}

/// Attach the pre-update snapshot to an update entry's details.
fn with_previous(mut details: Value, previous: Value) -> Value {
    if let Value::Object(map) = &mut details {
        map.insert("previous".to_string(), previous);
    }
    details
}

fn parse_dentition(raw: Option<&str>) -> ChartResult<Option<DentitionType>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => DentitionType::parse(s)
            .map(Some)
            .ok_or_else(|| ChartError::invalid("dentition_type", format!("unknown dentition '{s}'"))),
    }
}

fn parse_severity(raw: Option<&str>) -> ChartResult<Option<Severity>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Severity::parse(s)
            .map(Some)
            .ok_or_else(|| ChartError::invalid("severity", format!("unknown severity '{s}'"))),
    }
}

fn parse_status(raw: Option<&str>) -> ChartResult<Option<ProcedureStatus>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => ProcedureStatus::parse(s)
            .map(Some)
            .ok_or_else(|| ChartError::invalid("status", format!("unknown status '{s}'"))),
    }
}

fn parse_price(raw: Option<&str>) -> ChartResult<Option<Price>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Price::parse(s)
            .map(Some)
            .ok_or_else(|| ChartError::invalid("price", format!("'{s}' is not a non-negative amount"))),
    }
}

fn parse_date_performed(raw: &str) -> ChartResult<String> {
    parse_date(raw)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .ok_or_else(|| ChartError::invalid("date_performed", "expected a YYYY-MM-DD date"))
}

fn procedure_changes(patch: ProcedurePatch) -> ChartResult<ProcedureChanges> {
    Ok(ProcedureChanges {
        surfaces: patch.surface.as_deref().map(SurfaceSet::parse).transpose()?,
        status: parse_status(patch.status.as_deref())?,
        price: parse_price(patch.price.as_deref())?,
        date_performed: patch
            .date_performed
            .as_deref()
            .map(parse_date_performed)
            .transpose()?,
        performed_by: patch.performed_by,
        notes: notes_change(patch.notes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActorRef, HistoryFilter};
    use crate::service::OpenAccess;

    fn setup_db() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        db.seed_standard_catalogs().unwrap();
        let patient = Patient::new("clinic-1".into(), "Jane Doe".into());
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    fn ctx() -> ChartContext {
        ChartContext::new("clinic-1", ActorRef::with_name("u-1", "Dr. Smith"))
    }

    fn cavity_on(tooth: &str) -> AddConditionRequest {
        AddConditionRequest {
            tooth_number: tooth.into(),
            dentition_type: None,
            entry: EntrySelection::Catalog(1),
            surface: "occlusal".into(),
            severity: Some("moderate".into()),
            notes: None,
        }
    }

    fn filling_on(tooth: &str) -> AddProcedureRequest {
        AddProcedureRequest {
            tooth_number: tooth.into(),
            dentition_type: None,
            entry: EntrySelection::Catalog(3),
            surface: "occlusal".into(),
            status: Some("planned".into()),
            price: None,
            date_performed: "2024-03-01".into(),
            performed_by: None,
            notes: None,
        }
    }

    fn history(db: &Database, patient: &Patient) -> Vec<ChartHistoryEntry> {
        AuditLog::new(db, 50)
            .entries(&patient.patient_id, HistoryFilter::default())
            .unwrap()
    }

    #[test]
    fn test_add_condition_records_history() {
        let (db, patient) = setup_db();
        let config = ChartConfig::default();
        let service = MutationService::new(&db, &config, &OpenAccess);

        let condition = service
            .add_condition(&ctx(), &patient.patient_id, cavity_on("3"))
            .unwrap();
        assert_eq!(condition.reference.name(), "Cavity");

        let entries = history(&db, &patient);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, HistoryAction::AddCondition);
        assert_eq!(entries[0].tooth_number.as_deref(), Some("3"));
        assert_eq!(entries[0].details["condition_id"], condition.id.as_str());
        assert_eq!(entries[0].actor.label(), "Dr. Smith");
    }

    #[test]
    fn test_validation_writes_nothing() {
        let (db, patient) = setup_db();
        let config = ChartConfig::default();
        let service = MutationService::new(&db, &config, &OpenAccess);

        let mut bad_surface = cavity_on("3");
        bad_surface.surface = "occlusal,top".into();
        assert!(matches!(
            service.add_condition(&ctx(), &patient.patient_id, bad_surface),
            Err(ChartError::InvalidSurface(_))
        ));

        let mut mismatch = cavity_on("A");
        mismatch.dentition_type = Some("permanent".into());
        assert!(matches!(
            service.add_condition(&ctx(), &patient.patient_id, mismatch),
            Err(ChartError::DentitionMismatch { .. })
        ));

        let mut unknown = cavity_on("3");
        unknown.entry = EntrySelection::Catalog(999);
        assert!(matches!(
            service.add_condition(&ctx(), &patient.patient_id, unknown),
            Err(ChartError::CatalogEntryNotFound { kind: "condition", id: 999 })
        ));

        assert!(history(&db, &patient).is_empty());
        assert!(db.list_conditions_for_patient(&patient.patient_id).unwrap().is_empty());
    }

    #[test]
    fn test_custom_code_synthesized() {
        let (db, patient) = setup_db();
        let config = ChartConfig::default();
        let service = MutationService::new(&db, &config, &OpenAccess);

        let mut request = cavity_on("9");
        request.entry = EntrySelection::Custom {
            name: "Unusual Wear".into(),
            code: None,
            description: None,
        };
        request.surface = "all".into();
        let condition = service
            .add_condition(&ctx(), &patient.patient_id, request)
            .unwrap();

        let code = condition.reference.code();
        assert!(code.starts_with("CUST-"));
        assert_eq!(code.len(), "CUST-".len() + 6);
        assert!(condition.reference.catalog_id().is_none());
    }

    #[test]
    fn test_blank_custom_fields_normalized() {
        let (db, patient) = setup_db();
        let config = ChartConfig::default();
        let service = MutationService::new(&db, &config, &OpenAccess);

        let mut request = cavity_on("9");
        request.entry = EntrySelection::Custom {
            name: "  Unusual Wear ".into(),
            code: Some("  ".into()),
            description: Some("".into()),
        };
        let condition = service
            .add_condition(&ctx(), &patient.patient_id, request)
            .unwrap();
        assert_eq!(condition.reference.name(), "Unusual Wear");
        assert!(condition.reference.code().starts_with("CUST-"));
        assert_eq!(
            condition.reference,
            EntryReference::Custom {
                name: "Unusual Wear".into(),
                code: condition.reference.code().to_string(),
                description: None,
            }
        );

        let mut request = filling_on("14");
        request.entry = EntrySelection::Custom {
            name: "Bite Splint".into(),
            code: Some("".into()),
            description: None,
        };
        let procedure = service
            .add_procedure(&ctx(), &patient.patient_id, request)
            .unwrap();
        assert!(procedure.reference.code().starts_with("CUST-"));
        assert_eq!(procedure.price, None);

        let mut request = cavity_on("9");
        request.entry = EntrySelection::Custom {
            name: "   ".into(),
            code: Some("X1".into()),
            description: None,
        };
        let err = service
            .add_condition(&ctx(), &patient.patient_id, request)
            .unwrap_err();
        assert_eq!(err.field(), Some("custom_name"));

        let mut request = filling_on("14");
        request.entry = EntrySelection::Custom {
            name: String::new(),
            code: None,
            description: None,
        };
        let err = service
            .add_procedure(&ctx(), &patient.patient_id, request)
            .unwrap_err();
        assert_eq!(err.field(), Some("custom_name"));
        assert_eq!(history(&db, &patient).len(), 2);
    }

    #[test]
    fn test_patch_notes_trimmed_or_cleared() {
        let (db, patient) = setup_db();
        let config = ChartConfig::default();
        let service = MutationService::new(&db, &config, &OpenAccess);
        let mut request = cavity_on("3");
        request.notes = Some("monitor".into());
        let condition = service
            .add_condition(&ctx(), &patient.patient_id, request)
            .unwrap();

        let patch = ConditionPatch {
            notes: Some("  recheck in 6 months ".into()),
            ..Default::default()
        };
        let updated = service
            .update_condition(&ctx(), &patient.patient_id, "3", &condition.id, patch)
            .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("recheck in 6 months"));

        let untouched = service
            .update_condition(&ctx(), &patient.patient_id, "3", &condition.id, ConditionPatch::default())
            .unwrap();
        assert_eq!(untouched.notes.as_deref(), Some("recheck in 6 months"));

        let patch = ConditionPatch {
            notes: Some("   ".into()),
            ..Default::default()
        };
        let cleared = service
            .update_condition(&ctx(), &patient.patient_id, "3", &condition.id, patch)
            .unwrap();
        assert_eq!(cleared.notes, None);

        let procedure = service
            .add_procedure(&ctx(), &patient.patient_id, filling_on("14"))
            .unwrap();
        let patch = ProcedurePatch {
            notes: Some(" ".into()),
            ..Default::default()
        };
        let updated = service
            .update_procedure(&ctx(), &patient.patient_id, "14", &procedure.id, patch)
            .unwrap();
        assert_eq!(updated.notes, None);

        let stored = db.list_conditions_for_patient(&patient.patient_id).unwrap();
        assert_eq!(stored[0].notes, None);
    }

    #[test]
    fn test_update_records_previous() {
        let (db, patient) = setup_db();
        let config = ChartConfig::default();
        let service = MutationService::new(&db, &config, &OpenAccess);
        let condition = service
            .add_condition(&ctx(), &patient.patient_id, cavity_on("3"))
            .unwrap();

        let patch = ConditionPatch {
            severity: Some("severe".into()),
            ..Default::default()
        };
        let updated = service
            .update_condition(&ctx(), &patient.patient_id, "3", &condition.id, patch)
            .unwrap();
        assert_eq!(updated.severity, Some(Severity::Severe));

        let entries = history(&db, &patient);
        assert_eq!(entries[0].action, HistoryAction::UpdateCondition);
        assert_eq!(entries[0].details["severity"], "severe");
        assert_eq!(entries[0].details["previous"]["severity"], "moderate");
    }

    #[test]
    fn test_procedure_price_defaults_from_catalog() {
        let (db, patient) = setup_db();
        let config = ChartConfig::default();
        let service = MutationService::new(&db, &config, &OpenAccess);

        let procedure = service
            .add_procedure(&ctx(), &patient.patient_id, filling_on("14"))
            .unwrap();
        assert_eq!(procedure.price.map(|p| p.to_string()).as_deref(), Some("180.00"));

        let mut priced = filling_on("15");
        priced.price = Some("150.5".into());
        let procedure = service
            .add_procedure(&ctx(), &patient.patient_id, priced)
            .unwrap();
        assert_eq!(procedure.price.map(|p| p.cents()), Some(15050));
    }

    #[test]
    fn test_bad_procedure_fields() {
        let (db, patient) = setup_db();
        let config = ChartConfig::default();
        let service = MutationService::new(&db, &config, &OpenAccess);

        let mut request = filling_on("14");
        request.price = Some("-5".into());
        let err = service.add_procedure(&ctx(), &patient.patient_id, request).unwrap_err();
        assert_eq!(err.field(), Some("price"));

        let mut request = filling_on("14");
        request.date_performed = "03/01/2024".into();
        let err = service.add_procedure(&ctx(), &patient.patient_id, request).unwrap_err();
        assert_eq!(err.field(), Some("date_performed"));

        let mut request = filling_on("14");
        request.status = Some("done".into());
        let err = service.add_procedure(&ctx(), &patient.patient_id, request).unwrap_err();
        assert_eq!(err.field(), Some("status"));
    }

    #[test]
    fn test_failed_transition_rolls_back() {
        let (db, patient) = setup_db();
        let config = ChartConfig::default();
        let service = MutationService::new(&db, &config, &OpenAccess);
        let procedure = service
            .add_procedure(&ctx(), &patient.patient_id, filling_on("14"))
            .unwrap();
        let cancel = ProcedurePatch {
            status: Some("cancelled".into()),
            ..Default::default()
        };
        service
            .update_procedure(&ctx(), &patient.patient_id, "14", &procedure.id, cancel.clone())
            .unwrap();

        let err = service
            .update_procedure(&ctx(), &patient.patient_id, "14", &procedure.id, cancel)
            .unwrap_err();
        assert!(matches!(err, ChartError::InvalidStatusTransition(_)));
        assert_eq!(history(&db, &patient).len(), 2);
    }

    #[test]
    fn test_progress_note_history() {
        let (db, patient) = setup_db();
        let config = ChartConfig::default();
        let service = MutationService::new(&db, &config, &OpenAccess);
        let procedure = service
            .add_procedure(&ctx(), &patient.patient_id, filling_on("14"))
            .unwrap();

        let note = service
            .add_progress_note(
                &ctx(),
                &patient.patient_id,
                AddNoteRequest {
                    procedure_id: procedure.id.clone(),
                    note: "Temporary crown placed".into(),
                    appointment_date: "2024-03-08".into(),
                },
            )
            .unwrap();
        assert_eq!(note.appointment_date, "2024-03-08T00:00:00.000000Z");

        let entries = history(&db, &patient);
        assert_eq!(entries[0].action, HistoryAction::AddProcedureNote);
        assert_eq!(entries[0].tooth_number.as_deref(), Some("14"));
        assert_eq!(entries[0].details["note_id"], note.id.as_str());
    }

    #[test]
    fn test_general_procedure_has_no_tooth() {
        let (db, patient) = setup_db();
        let config = ChartConfig::default();
        let service = MutationService::new(&db, &config, &OpenAccess);

        let procedure = service
            .add_general_procedure(
                &ctx(),
                &patient.patient_id,
                AddGeneralProcedureRequest {
                    entry: EntrySelection::Catalog(5),
                    status: None,
                    price: None,
                    date_performed: "2024-04-10".into(),
                    performed_by: Some(ActorRef::new("u-2")),
                    notes: None,
                },
            )
            .unwrap();
        assert!(procedure.is_general());
        assert_eq!(procedure.status, ProcedureStatus::Completed);
        assert!(procedure.surfaces.is_all());

        let entries = history(&db, &patient);
        assert_eq!(entries[0].tooth_number, None);
        assert_eq!(entries[0].details["general"], true);

        let patch = ProcedurePatch {
            surface: Some("mesial".into()),
            ..Default::default()
        };
        let err = service
            .update_general_procedure(&ctx(), &patient.patient_id, &procedure.id, patch)
            .unwrap_err();
        assert_eq!(err.field(), Some("surface"));
    }

    #[test]
    fn test_register_patient() {
        let (db, _) = setup_db();
        let config = ChartConfig::default();
        let service = MutationService::new(&db, &config, &OpenAccess);

        let patient = service.register_patient(&ctx(), "  John Roe ").unwrap();
        assert_eq!(patient.name, "John Roe");
        assert_eq!(patient.clinic_id, "clinic-1");
        assert!(service.register_patient(&ctx(), " ").is_err());
    }
}
