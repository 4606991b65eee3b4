//! Dental Chart Core Library
//!
//! Per-tooth dental charting with an append-only, hash-chained history.
//!
//! # Architecture
//!
//! ```text
//!        caller request (ChartContext + raw fields)
//!                        │
//!                 ClinicAccess check
//!                        │
//!          validate (registry, surfaces, catalog)
//!                        │
//!       ┌────────────────▼────────────────┐
//!       │         one transaction         │
//!       │  ChartStore / GeneralLedger     │
//!       │  write  +  AuditLog append      │
//!       └────────────────┬────────────────┘
//!                        │
//!          ┌─────────────┼──────────────┐
//!          ▼             ▼              ▼
//!      get_chart   history cursor   summaries
//! ```
//!
//! # Core Principle
//!
//! **No chart change without a history entry.** State writes and their
//! history entry commit together or not at all.
//!
//! # Modules
//!
//! - [`registry`]: Static tooth registry (permanent 1-32, primary A-T)
//! - [`models`]: Domain types (Tooth, ToothCondition, ToothProcedure, etc.)
//! - [`db`]: SQLite persistence
//! - [`store`]: Tooth-bound chart state
//! - [`ledger`]: General (whole-mouth) procedures
//! - [`audit`]: Hash-chained history log and lazy queries
//! - [`service`]: Authorized, atomic mutations and reads
//! - [`export`]: Treatment summary and history export

pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod ledger;
pub mod models;
pub mod registry;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use audit::{AuditLog, ChainVerification, HistoryCursor};
pub use config::ChartConfig;
pub use db::Database;
pub use error::{ChartError, ChartResult, ErrorKind};
pub use export::{HistoryExport, TreatmentSummary};
pub use ledger::GeneralProcedureLedger;
pub use models::{
    ActorRef, ChartContext, ChartHistoryEntry, DentalChart, DentitionType, EntryReference,
    HistoryAction, HistoryCategory, HistoryFilter, Patient, Price, ProcedureStatus, ProgressNote,
    Severity, SurfaceSet, Tooth, ToothCondition, ToothProcedure,
};
pub use registry::ToothRegistry;
pub use service::{ChartQueries, ClinicAccess, MutationService, OpenAccess};
pub use store::ChartStore;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use service::{
    AddConditionRequest, AddGeneralProcedureRequest, AddNoteRequest, AddProcedureRequest,
    ConditionPatch, EntrySelection, ProcedurePatch,
};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum DentalChartError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<ChartError> for DentalChartError {
    fn from(e: ChartError) -> Self {
        let message = e.to_string();
        match e.kind() {
            ErrorKind::Validation => DentalChartError::Validation(message),
            ErrorKind::NotFound => DentalChartError::NotFound(message),
            ErrorKind::Conflict => DentalChartError::Conflict(message),
            ErrorKind::Persistence => DentalChartError::Persistence(message),
            ErrorKind::Authorization => DentalChartError::Authorization(message),
        }
    }
}

impl From<db::DbError> for DentalChartError {
    fn from(e: db::DbError) -> Self {
        DentalChartError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for DentalChartError {
    fn from(e: serde_json::Error) -> Self {
        DentalChartError::Serialization(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for DentalChartError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        DentalChartError::Persistence(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a chart database at the given path.
#[uniffi::export]
pub fn open_chart_store(path: String) -> Result<Arc<DentalChartCore>, DentalChartError> {
    let db = Database::open(&path)?;
    Ok(Arc::new(DentalChartCore::new(db, ChartConfig::default(), Arc::new(OpenAccess))))
}

/// Open a chart database with explicit configuration.
#[uniffi::export]
pub fn open_chart_store_with_config(
    path: String,
    config: FfiChartConfig,
) -> Result<Arc<DentalChartCore>, DentalChartError> {
    let config = ChartConfig::try_from(config)?;
    let db = Database::open(&path)?;
    Ok(Arc::new(DentalChartCore::new(db, config, Arc::new(OpenAccess))))
}

/// Create an in-memory chart database (for testing).
#[uniffi::export]
pub fn open_chart_store_in_memory() -> Result<Arc<DentalChartCore>, DentalChartError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(DentalChartCore::new(db, ChartConfig::default(), Arc::new(OpenAccess))))
}

/// Install a `tracing` subscriber writing to stderr.
///
/// `filter` uses `RUST_LOG` syntax; when absent, `RUST_LOG` is read, falling
/// back to `dental_chart_core=info`. Calling it twice is harmless.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) {
    let filter = match filter {
        Some(directives) => tracing_subscriber::EnvFilter::new(directives),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dental_chart_core=info")),
    };
    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        tracing::debug!(error = %e, "tracing already initialized");
    }
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe chart engine for FFI.
///
/// Every call holds the connection lock for its whole duration, so chart
/// writes are serialized.
#[derive(uniffi::Object)]
pub struct DentalChartCore {
    db: Arc<Mutex<Database>>,
    config: ChartConfig,
    access: Arc<dyn ClinicAccess>,
}

impl DentalChartCore {
    /// Build an engine with a host-supplied access policy.
    pub fn new(db: Database, config: ChartConfig, access: Arc<dyn ClinicAccess>) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            config,
            access,
        }
    }
}

#[uniffi::export]
impl DentalChartCore {
    // =========================================================================
    // Catalog Operations
    // =========================================================================

    /// Load the standard condition and procedure catalogs.
    pub fn seed_standard_catalogs(&self) -> Result<(), DentalChartError> {
        let db = self.db.lock()?;
        db.seed_standard_catalogs()?;
        Ok(())
    }

    /// Add or update a condition catalog entry.
    pub fn upsert_condition_catalog_entry(&self, entry: FfiConditionCatalogEntry) -> Result<(), DentalChartError> {
        let db = self.db.lock()?;
        db.upsert_condition_entry(&entry.into())?;
        Ok(())
    }

    /// Add or update a procedure catalog entry.
    pub fn upsert_procedure_catalog_entry(&self, entry: FfiProcedureCatalogEntry) -> Result<(), DentalChartError> {
        let entry = models::ProcedureCatalogEntry::try_from(entry)?;
        let db = self.db.lock()?;
        db.upsert_procedure_entry(&entry)?;
        Ok(())
    }

    pub fn list_condition_catalog(&self) -> Result<Vec<FfiConditionCatalogEntry>, DentalChartError> {
        let db = self.db.lock()?;
        let entries = ChartQueries::new(&db, &self.config, self.access.as_ref()).condition_catalog()?;
        Ok(entries.into_iter().map(|e| e.into()).collect())
    }

    /// List procedure catalog entries, optionally in one category.
    pub fn list_procedure_catalog(
        &self,
        category: Option<String>,
    ) -> Result<Vec<FfiProcedureCatalogEntry>, DentalChartError> {
        let db = self.db.lock()?;
        let entries = ChartQueries::new(&db, &self.config, self.access.as_ref())
            .procedure_catalog(category.as_deref())?;
        Ok(entries.into_iter().map(|e| e.into()).collect())
    }

    pub fn search_condition_catalog(
        &self,
        query: String,
    ) -> Result<Vec<FfiConditionCatalogEntry>, DentalChartError> {
        let db = self.db.lock()?;
        let entries = ChartQueries::new(&db, &self.config, self.access.as_ref()).search_conditions(&query)?;
        Ok(entries.into_iter().map(|e| e.into()).collect())
    }

    pub fn search_procedure_catalog(
        &self,
        query: String,
    ) -> Result<Vec<FfiProcedureCatalogEntry>, DentalChartError> {
        let db = self.db.lock()?;
        let entries = ChartQueries::new(&db, &self.config, self.access.as_ref()).search_procedures(&query)?;
        Ok(entries.into_iter().map(|e| e.into()).collect())
    }

    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Register a patient in the context's clinic.
    pub fn register_patient(&self, ctx: FfiContext, name: String) -> Result<FfiPatient, DentalChartError> {
        let db = self.db.lock()?;
        let patient = self.mutations(&db).register_patient(&ctx.into(), &name)?;
        Ok(patient.into())
    }

    pub fn get_patient(&self, ctx: FfiContext, patient_id: String) -> Result<FfiPatient, DentalChartError> {
        let db = self.db.lock()?;
        let patient = self.queries(&db).get_patient(&ctx.into(), &patient_id)?;
        Ok(patient.into())
    }

    pub fn list_patients(&self, ctx: FfiContext) -> Result<Vec<FfiPatient>, DentalChartError> {
        let db = self.db.lock()?;
        let patients = self.queries(&db).list_patients(&ctx.into())?;
        Ok(patients.into_iter().map(|p| p.into()).collect())
    }

    // =========================================================================
    // Chart Operations
    // =========================================================================

    pub fn get_chart(&self, ctx: FfiContext, patient_id: String) -> Result<FfiChart, DentalChartError> {
        let db = self.db.lock()?;
        let chart = self.queries(&db).get_chart(&ctx.into(), &patient_id)?;
        Ok(chart.into())
    }

    pub fn add_tooth_condition(
        &self,
        ctx: FfiContext,
        patient_id: String,
        input: FfiConditionInput,
    ) -> Result<FfiCondition, DentalChartError> {
        let request = AddConditionRequest::try_from(input)?;
        let db = self.db.lock()?;
        let condition = self.mutations(&db).add_condition(&ctx.into(), &patient_id, request)?;
        Ok(condition.into())
    }

    pub fn update_tooth_condition(
        &self,
        ctx: FfiContext,
        patient_id: String,
        tooth_number: String,
        condition_id: String,
        patch: FfiConditionPatch,
    ) -> Result<FfiCondition, DentalChartError> {
        let db = self.db.lock()?;
        let condition = self.mutations(&db).update_condition(
            &ctx.into(),
            &patient_id,
            &tooth_number,
            &condition_id,
            patch.into(),
        )?;
        Ok(condition.into())
    }

    pub fn delete_tooth_condition(
        &self,
        ctx: FfiContext,
        patient_id: String,
        tooth_number: String,
        condition_id: String,
    ) -> Result<(), DentalChartError> {
        let db = self.db.lock()?;
        self.mutations(&db)
            .delete_condition(&ctx.into(), &patient_id, &tooth_number, &condition_id)?;
        Ok(())
    }

    pub fn add_tooth_procedure(
        &self,
        ctx: FfiContext,
        patient_id: String,
        input: FfiProcedureInput,
    ) -> Result<FfiProcedure, DentalChartError> {
        let request = AddProcedureRequest::try_from(input)?;
        let db = self.db.lock()?;
        let procedure = self.mutations(&db).add_procedure(&ctx.into(), &patient_id, request)?;
        Ok(procedure.into())
    }

    pub fn update_tooth_procedure(
        &self,
        ctx: FfiContext,
        patient_id: String,
        tooth_number: String,
        procedure_id: String,
        patch: FfiProcedurePatch,
    ) -> Result<FfiProcedure, DentalChartError> {
        let db = self.db.lock()?;
        let procedure = self.mutations(&db).update_procedure(
            &ctx.into(),
            &patient_id,
            &tooth_number,
            &procedure_id,
            patch.into(),
        )?;
        Ok(procedure.into())
    }

    pub fn delete_tooth_procedure(
        &self,
        ctx: FfiContext,
        patient_id: String,
        tooth_number: String,
        procedure_id: String,
    ) -> Result<(), DentalChartError> {
        let db = self.db.lock()?;
        self.mutations(&db)
            .delete_procedure(&ctx.into(), &patient_id, &tooth_number, &procedure_id)?;
        Ok(())
    }

    /// Append a progress note to a tooth-bound or general procedure.
    pub fn add_procedure_note(
        &self,
        ctx: FfiContext,
        patient_id: String,
        procedure_id: String,
        note: String,
        appointment_date: String,
    ) -> Result<FfiProgressNote, DentalChartError> {
        let db = self.db.lock()?;
        let note = self.mutations(&db).add_progress_note(
            &ctx.into(),
            &patient_id,
            AddNoteRequest {
                procedure_id,
                note,
                appointment_date,
            },
        )?;
        Ok(note.into())
    }

    // =========================================================================
    // General Procedure Operations
    // =========================================================================

    pub fn list_general_procedures(
        &self,
        ctx: FfiContext,
        patient_id: String,
    ) -> Result<Vec<FfiProcedure>, DentalChartError> {
        let db = self.db.lock()?;
        let procedures = self.queries(&db).general_procedures(&ctx.into(), &patient_id)?;
        Ok(procedures.into_iter().map(|p| p.into()).collect())
    }

    pub fn add_general_procedure(
        &self,
        ctx: FfiContext,
        patient_id: String,
        input: FfiGeneralProcedureInput,
    ) -> Result<FfiProcedure, DentalChartError> {
        let request = AddGeneralProcedureRequest::try_from(input)?;
        let db = self.db.lock()?;
        let procedure = self
            .mutations(&db)
            .add_general_procedure(&ctx.into(), &patient_id, request)?;
        Ok(procedure.into())
    }

    pub fn update_general_procedure(
        &self,
        ctx: FfiContext,
        patient_id: String,
        procedure_id: String,
        patch: FfiProcedurePatch,
    ) -> Result<FfiProcedure, DentalChartError> {
        let db = self.db.lock()?;
        let procedure = self.mutations(&db).update_general_procedure(
            &ctx.into(),
            &patient_id,
            &procedure_id,
            patch.into(),
        )?;
        Ok(procedure.into())
    }

    pub fn delete_general_procedure(
        &self,
        ctx: FfiContext,
        patient_id: String,
        procedure_id: String,
    ) -> Result<(), DentalChartError> {
        let db = self.db.lock()?;
        self.mutations(&db)
            .delete_general_procedure(&ctx.into(), &patient_id, &procedure_id)?;
        Ok(())
    }

    // =========================================================================
    // History Operations
    // =========================================================================

    /// History entries newest first, stopping at `query.limit` when given.
    pub fn get_history(
        &self,
        ctx: FfiContext,
        patient_id: String,
        query: FfiHistoryQuery,
    ) -> Result<Vec<FfiHistoryEntry>, DentalChartError> {
        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let filter = HistoryFilter::try_from(query)?;
        let db = self.db.lock()?;
        let cursor = self.queries(&db).history(&ctx.into(), &patient_id, filter)?;

        let mut entries = Vec::new();
        for entry in cursor.take(limit) {
            entries.push(entry?.into());
        }
        Ok(entries)
    }

    /// Recompute the patient's history hash chain.
    pub fn verify_history(
        &self,
        ctx: FfiContext,
        patient_id: String,
    ) -> Result<FfiChainVerification, DentalChartError> {
        let db = self.db.lock()?;
        let verification = self.queries(&db).verify_chain(&ctx.into(), &patient_id)?;
        Ok(verification.into())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    pub fn treatment_summary_json(&self, ctx: FfiContext, patient_id: String) -> Result<String, DentalChartError> {
        let db = self.db.lock()?;
        let summary = self.queries(&db).treatment_summary(&ctx.into(), &patient_id)?;
        Ok(summary.to_json()?)
    }

    pub fn treatment_summary_csv(&self, ctx: FfiContext, patient_id: String) -> Result<String, DentalChartError> {
        let db = self.db.lock()?;
        let summary = self.queries(&db).treatment_summary(&ctx.into(), &patient_id)?;
        Ok(summary.to_csv())
    }

    pub fn export_history_json(
        &self,
        ctx: FfiContext,
        patient_id: String,
        query: FfiHistoryQuery,
    ) -> Result<String, DentalChartError> {
        let filter = HistoryFilter::try_from(query)?;
        let db = self.db.lock()?;
        let export = self.queries(&db).export_history(&ctx.into(), &patient_id, filter)?;
        Ok(export.to_json()?)
    }
}

impl DentalChartCore {
    fn mutations<'a>(&'a self, db: &'a Database) -> MutationService<'a> {
        MutationService::new(db, &self.config, self.access.as_ref())
    }

    fn queries<'a>(&'a self, db: &'a Database) -> ChartQueries<'a> {
        ChartQueries::new(db, &self.config, self.access.as_ref())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe call context.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiContext {
    pub clinic_id: String,
    pub actor_id: String,
    pub actor_name: Option<String>,
}

impl From<FfiContext> for ChartContext {
    fn from(ctx: FfiContext) -> Self {
        ChartContext::new(ctx.clinic_id, actor_ref(ctx.actor_id, ctx.actor_name))
    }
}

fn actor_ref(id: String, name: Option<String>) -> ActorRef {
    ActorRef {
        id,
        display_name: name,
    }
}

/// FFI-safe engine configuration.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiChartConfig {
    pub custom_code_prefix: String,
    pub custom_code_length: u32,
    pub history_page_size: u32,
    pub persistence_retries: u32,
    pub search_limit: u32,
}

impl TryFrom<FfiChartConfig> for ChartConfig {
    type Error = ChartError;

    fn try_from(config: FfiChartConfig) -> Result<Self, Self::Error> {
        ChartConfig::new(
            config.custom_code_prefix,
            config.custom_code_length as usize,
            config.history_page_size as usize,
            config.persistence_retries,
            config.search_limit as usize,
        )
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub patient_id: String,
    pub clinic_id: String,
    pub name: String,
    pub created_at: String,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            patient_id: patient.patient_id,
            clinic_id: patient.clinic_id,
            name: patient.name,
            created_at: patient.created_at,
        }
    }
}

/// FFI-safe condition catalog entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiConditionCatalogEntry {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: String,
    pub color_code: Option<String>,
    pub icon: Option<String>,
    pub is_standard: bool,
}

impl From<models::ConditionCatalogEntry> for FfiConditionCatalogEntry {
    fn from(entry: models::ConditionCatalogEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            code: entry.code,
            description: entry.description,
            color_code: entry.color_code,
            icon: entry.icon,
            is_standard: entry.is_standard,
        }
    }
}

impl From<FfiConditionCatalogEntry> for models::ConditionCatalogEntry {
    fn from(entry: FfiConditionCatalogEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            code: entry.code,
            description: entry.description,
            color_code: entry.color_code,
            icon: entry.icon,
            is_standard: entry.is_standard,
        }
    }
}

/// FFI-safe procedure catalog entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProcedureCatalogEntry {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: String,
    pub category: String,
    /// Two-decimal string, e.g. "120.00"
    pub default_price: String,
    pub duration_minutes: u32,
    pub is_standard: bool,
}

impl From<models::ProcedureCatalogEntry> for FfiProcedureCatalogEntry {
    fn from(entry: models::ProcedureCatalogEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            code: entry.code,
            description: entry.description,
            category: entry.category,
            default_price: entry.default_price.to_string(),
            duration_minutes: entry.duration_minutes,
            is_standard: entry.is_standard,
        }
    }
}

impl TryFrom<FfiProcedureCatalogEntry> for models::ProcedureCatalogEntry {
    type Error = ChartError;

    fn try_from(entry: FfiProcedureCatalogEntry) -> Result<Self, Self::Error> {
        let default_price = Price::parse(&entry.default_price).ok_or_else(|| {
            ChartError::invalid("default_price", format!("'{}' is not a non-negative amount", entry.default_price))
        })?;
        Ok(Self {
            id: entry.id,
            name: entry.name,
            code: entry.code,
            description: entry.description,
            category: entry.category,
            default_price,
            duration_minutes: entry.duration_minutes,
            is_standard: entry.is_standard,
        })
    }
}

/// FFI-safe charted condition.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiCondition {
    pub id: String,
    pub tooth_number: String,
    pub catalog_condition_id: Option<i64>,
    pub name: String,
    pub code: String,
    pub custom_description: Option<String>,
    pub surface: String,
    pub severity: Option<String>,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_by: Option<String>,
    pub updated_at: Option<String>,
}

impl From<ToothCondition> for FfiCondition {
    fn from(condition: ToothCondition) -> Self {
        Self {
            catalog_condition_id: condition.reference.catalog_id(),
            name: condition.reference.name().to_string(),
            code: condition.reference.code().to_string(),
            custom_description: custom_description(&condition.reference),
            surface: condition.surfaces.to_wire(),
            severity: condition.severity.map(|s| s.as_str().to_string()),
            created_by: condition.created_by.id,
            updated_by: condition.updated_by.map(|a| a.id),
            id: condition.id,
            tooth_number: condition.tooth_number,
            notes: condition.notes,
            created_at: condition.created_at,
            updated_at: condition.updated_at,
        }
    }
}

fn custom_description(reference: &EntryReference) -> Option<String> {
    match reference {
        EntryReference::Custom { description, .. } => description.clone(),
        EntryReference::Catalog { .. } => None,
    }
}

/// FFI-safe progress note.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProgressNote {
    pub id: String,
    pub procedure_id: String,
    pub note: String,
    pub appointment_date: String,
    pub created_by: String,
    pub created_at: String,
}

impl From<ProgressNote> for FfiProgressNote {
    fn from(note: ProgressNote) -> Self {
        Self {
            id: note.id,
            procedure_id: note.procedure_id,
            note: note.note,
            appointment_date: note.appointment_date,
            created_by: note.created_by.id,
            created_at: note.created_at,
        }
    }
}

/// FFI-safe charted procedure. `tooth_number` is `None` for general procedures.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProcedure {
    pub id: String,
    pub tooth_number: Option<String>,
    pub catalog_procedure_id: Option<i64>,
    pub name: String,
    pub code: String,
    pub custom_description: Option<String>,
    pub surface: String,
    pub status: String,
    pub price: Option<String>,
    pub date_performed: String,
    pub performed_by: Option<String>,
    pub notes: Option<String>,
    pub progress_notes: Vec<FfiProgressNote>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<ToothProcedure> for FfiProcedure {
    fn from(procedure: ToothProcedure) -> Self {
        Self {
            catalog_procedure_id: procedure.reference.catalog_id(),
            name: procedure.reference.name().to_string(),
            code: procedure.reference.code().to_string(),
            custom_description: custom_description(&procedure.reference),
            surface: procedure.surfaces.to_wire(),
            status: procedure.status.as_str().to_string(),
            price: procedure.price.map(|p| p.to_string()),
            performed_by: procedure.performed_by.map(|a| a.id),
            progress_notes: procedure.progress_notes.into_iter().map(|n| n.into()).collect(),
            id: procedure.id,
            tooth_number: procedure.tooth_number,
            date_performed: procedure.date_performed,
            notes: procedure.notes,
            created_at: procedure.created_at,
            updated_at: procedure.updated_at,
        }
    }
}

/// FFI-safe chart tooth.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTooth {
    pub number: String,
    pub universal_number: u32,
    pub dentition_type: String,
    pub quadrant: String,
    pub tooth_type: String,
    pub name: String,
    pub conditions: Vec<FfiCondition>,
    pub procedures: Vec<FfiProcedure>,
}

impl From<models::ChartTooth> for FfiTooth {
    fn from(chart_tooth: models::ChartTooth) -> Self {
        let tooth = chart_tooth.tooth;
        Self {
            number: tooth.number,
            universal_number: tooth.universal_number,
            dentition_type: tooth.dentition_type.as_str().to_string(),
            quadrant: tooth.quadrant.as_str().to_string(),
            tooth_type: tooth.tooth_type.as_str().to_string(),
            name: tooth.name,
            conditions: chart_tooth.conditions.into_iter().map(|c| c.into()).collect(),
            procedures: chart_tooth.procedures.into_iter().map(|p| p.into()).collect(),
        }
    }
}

/// FFI-safe chart.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiChart {
    pub patient_id: String,
    pub patient_name: String,
    pub last_updated: Option<String>,
    pub permanent_teeth: Vec<FfiTooth>,
    pub primary_teeth: Vec<FfiTooth>,
    pub general_procedures: Vec<FfiProcedure>,
}

impl From<DentalChart> for FfiChart {
    fn from(chart: DentalChart) -> Self {
        Self {
            patient_id: chart.patient_id,
            patient_name: chart.patient_name,
            last_updated: chart.last_updated,
            permanent_teeth: chart.permanent_teeth.into_iter().map(|t| t.into()).collect(),
            primary_teeth: chart.primary_teeth.into_iter().map(|t| t.into()).collect(),
            general_procedures: chart.general_procedures.into_iter().map(|p| p.into()).collect(),
        }
    }
}

/// FFI-safe new condition.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiConditionInput {
    pub tooth_number: String,
    pub dentition_type: Option<String>,
    /// Catalog condition ID; omit to chart a custom condition
    pub condition_id: Option<i64>,
    pub custom_name: Option<String>,
    pub custom_code: Option<String>,
    pub custom_description: Option<String>,
    pub surface: String,
    pub severity: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<FfiConditionInput> for AddConditionRequest {
    type Error = ChartError;

    fn try_from(input: FfiConditionInput) -> Result<Self, Self::Error> {
        Ok(AddConditionRequest {
            entry: EntrySelection::from_fields(
                input.condition_id,
                input.custom_name,
                input.custom_code,
                input.custom_description,
            )?,
            tooth_number: input.tooth_number,
            dentition_type: input.dentition_type,
            surface: input.surface,
            severity: input.severity,
            notes: input.notes,
        })
    }
}

/// FFI-safe condition update; `None` fields are left unchanged.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiConditionPatch {
    pub surface: Option<String>,
    pub severity: Option<String>,
    /// Blank clears
    pub notes: Option<String>,
}

impl From<FfiConditionPatch> for ConditionPatch {
    fn from(patch: FfiConditionPatch) -> Self {
        ConditionPatch {
            surface: patch.surface,
            severity: patch.severity,
            notes: patch.notes,
        }
    }
}

/// FFI-safe new tooth procedure.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProcedureInput {
    pub tooth_number: String,
    pub dentition_type: Option<String>,
    /// Catalog procedure ID; omit to chart a custom procedure
    pub procedure_id: Option<i64>,
    pub custom_name: Option<String>,
    pub custom_code: Option<String>,
    pub custom_description: Option<String>,
    pub surface: String,
    pub status: Option<String>,
    pub price: Option<String>,
    pub date_performed: String,
    pub performed_by_id: Option<String>,
    pub performed_by_name: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<FfiProcedureInput> for AddProcedureRequest {
    type Error = ChartError;

    fn try_from(input: FfiProcedureInput) -> Result<Self, Self::Error> {
        Ok(AddProcedureRequest {
            entry: EntrySelection::from_fields(
                input.procedure_id,
                input.custom_name,
                input.custom_code,
                input.custom_description,
            )?,
            tooth_number: input.tooth_number,
            dentition_type: input.dentition_type,
            surface: input.surface,
            status: input.status,
            price: input.price,
            date_performed: input.date_performed,
            performed_by: input
                .performed_by_id
                .map(|id| actor_ref(id, input.performed_by_name)),
            notes: input.notes,
        })
    }
}

/// FFI-safe new general procedure.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiGeneralProcedureInput {
    pub procedure_id: Option<i64>,
    pub custom_name: Option<String>,
    pub custom_code: Option<String>,
    pub custom_description: Option<String>,
    pub status: Option<String>,
    pub price: Option<String>,
    pub date_performed: String,
    pub performed_by_id: Option<String>,
    pub performed_by_name: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<FfiGeneralProcedureInput> for AddGeneralProcedureRequest {
    type Error = ChartError;

    fn try_from(input: FfiGeneralProcedureInput) -> Result<Self, Self::Error> {
        Ok(AddGeneralProcedureRequest {
            entry: EntrySelection::from_fields(
                input.procedure_id,
                input.custom_name,
                input.custom_code,
                input.custom_description,
            )?,
            status: input.status,
            price: input.price,
            date_performed: input.date_performed,
            performed_by: input
                .performed_by_id
                .map(|id| actor_ref(id, input.performed_by_name)),
            notes: input.notes,
        })
    }
}

/// FFI-safe procedure update; `None` fields are left unchanged.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiProcedurePatch {
    pub surface: Option<String>,
    pub status: Option<String>,
    pub price: Option<String>,
    pub date_performed: Option<String>,
    pub performed_by_id: Option<String>,
    pub performed_by_name: Option<String>,
    /// Blank clears
    pub notes: Option<String>,
}

impl From<FfiProcedurePatch> for ProcedurePatch {
    fn from(patch: FfiProcedurePatch) -> Self {
        ProcedurePatch {
            surface: patch.surface,
            status: patch.status,
            price: patch.price,
            date_performed: patch.date_performed,
            performed_by: patch
                .performed_by_id
                .map(|id| actor_ref(id, patch.performed_by_name)),
            notes: patch.notes,
        }
    }
}

/// FFI-safe history query. Dates are inclusive `YYYY-MM-DD` days.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHistoryQuery {
    pub tooth_number: Option<String>,
    pub action: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u32>,
}

impl TryFrom<FfiHistoryQuery> for HistoryFilter {
    type Error = ChartError;

    fn try_from(query: FfiHistoryQuery) -> Result<Self, Self::Error> {
        let mut filter = HistoryFilter::default();
        if let Some(tooth) = service::non_blank(query.tooth_number) {
            filter = filter.tooth(registry::normalize_tooth_identity(&tooth));
        }
        if let Some(action) = service::non_blank(query.action) {
            filter = filter.action(
                HistoryAction::parse(&action)
                    .ok_or_else(|| ChartError::invalid("action", format!("unknown action '{action}'")))?,
            );
        }
        if let Some(category) = service::non_blank(query.category) {
            filter = filter.category(
                HistoryCategory::parse(&category).ok_or_else(|| {
                    ChartError::invalid("category", format!("unknown category '{category}'"))
                })?,
            );
        }
        let day = |field: &'static str, raw: Option<String>| -> ChartResult<Option<chrono::NaiveDate>> {
            service::non_blank(raw)
                .map(|d| models::parse_date(&d).ok_or_else(|| ChartError::invalid(field, "expected a YYYY-MM-DD date")))
                .transpose()
        };
        Ok(filter.between(day("start_date", query.start_date)?, day("end_date", query.end_date)?))
    }
}

/// FFI-safe history entry.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHistoryEntry {
    pub id: String,
    pub tooth_number: Option<String>,
    pub action: String,
    pub category: String,
    /// Snapshot of the changed entity as JSON
    pub details_json: String,
    pub actor_id: String,
    pub actor_name: Option<String>,
    pub timestamp: String,
    pub entry_hash: String,
}

impl From<ChartHistoryEntry> for FfiHistoryEntry {
    fn from(entry: ChartHistoryEntry) -> Self {
        Self {
            action: entry.action.as_str().to_string(),
            category: entry.category.as_str().to_string(),
            details_json: entry.details.to_string(),
            id: entry.id,
            tooth_number: entry.tooth_number,
            actor_id: entry.actor.id,
            actor_name: entry.actor.display_name,
            timestamp: entry.timestamp,
            entry_hash: entry.entry_hash,
        }
    }
}

/// FFI-safe chain verification result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiChainVerification {
    pub entries: u64,
    pub head_hash: Option<String>,
    pub first_broken: Option<String>,
    pub intact: bool,
}

impl From<ChainVerification> for FfiChainVerification {
    fn from(verification: ChainVerification) -> Self {
        Self {
            intact: verification.is_intact(),
            entries: verification.entries,
            head_hash: verification.head_hash,
            first_broken: verification.first_broken,
        }
    }
}
