//! Authorized chart reads. None of these write.

use crate::audit::{AuditLog, ChainVerification, HistoryCursor};
use crate::config::ChartConfig;
use crate::db::Database;
use crate::error::{ChartError, ChartResult};
use crate::export::{HistoryExport, TreatmentSummary};
use crate::ledger::GeneralProcedureLedger;
use crate::models::{
    ChartContext, ConditionCatalogEntry, DentalChart, HistoryFilter, Patient,
    ProcedureCatalogEntry, ToothProcedure,
};
use crate::store::ChartStore;

use super::access::{authorize_patient, ClinicAccess};

pub struct ChartQueries<'a> {
    db: &'a Database,
    config: &'a ChartConfig,
    access: &'a dyn ClinicAccess,
}

impl<'a> ChartQueries<'a> {
    pub fn new(db: &'a Database, config: &'a ChartConfig, access: &'a dyn ClinicAccess) -> Self {
        Self { db, config, access }
    }

    pub fn get_patient(&self, ctx: &ChartContext, patient_id: &str) -> ChartResult<Patient> {
        authorize_patient(self.db, self.access, ctx, patient_id)
    }

    /// Patients registered to the context's clinic, by name.
    pub fn list_patients(&self, ctx: &ChartContext) -> ChartResult<Vec<Patient>> {
        self.access.authorize(ctx).map_err(ChartError::Unauthorized)?;
        Ok(self.db.list_patients_for_clinic(&ctx.clinic_id)?)
    }

    pub fn get_chart(&self, ctx: &ChartContext, patient_id: &str) -> ChartResult<DentalChart> {
        let patient = authorize_patient(self.db, self.access, ctx, patient_id)?;
        ChartStore::new(self.db).get_chart(&patient)
    }

    /// Lazy newest-first history for a patient.
    pub fn history(
        &self,
        ctx: &ChartContext,
        patient_id: &str,
        filter: HistoryFilter,
    ) -> ChartResult<HistoryCursor<'a>> {
        let patient = authorize_patient(self.db, self.access, ctx, patient_id)?;
        Ok(self.audit_log().query(&patient.patient_id, filter))
    }

    pub fn general_procedures(&self, ctx: &ChartContext, patient_id: &str) -> ChartResult<Vec<ToothProcedure>> {
        let patient = authorize_patient(self.db, self.access, ctx, patient_id)?;
        GeneralProcedureLedger::new(self.db).list(&patient.patient_id)
    }

    pub fn treatment_summary(&self, ctx: &ChartContext, patient_id: &str) -> ChartResult<TreatmentSummary> {
        let chart = self.get_chart(ctx, patient_id)?;
        Ok(TreatmentSummary::from_chart(&chart))
    }

    /// Export matching history entries with the current chain head.
    pub fn export_history(
        &self,
        ctx: &ChartContext,
        patient_id: &str,
        filter: HistoryFilter,
    ) -> ChartResult<HistoryExport> {
        let patient = authorize_patient(self.db, self.access, ctx, patient_id)?;
        let log = self.audit_log();
        let verification = log.verify_chain(&patient.patient_id)?;
        let entries = log.entries(&patient.patient_id, filter.clone())?;
        Ok(HistoryExport::new(&patient, &filter, entries, verification))
    }

    pub fn verify_chain(&self, ctx: &ChartContext, patient_id: &str) -> ChartResult<ChainVerification> {
        let patient = authorize_patient(self.db, self.access, ctx, patient_id)?;
        self.audit_log().verify_chain(&patient.patient_id)
    }

    // Catalogs are global reference data and need no patient scope.

    pub fn condition_catalog(&self) -> ChartResult<Vec<ConditionCatalogEntry>> {
        Ok(self.db.list_condition_entries()?)
    }

    pub fn procedure_catalog(&self, category: Option<&str>) -> ChartResult<Vec<ProcedureCatalogEntry>> {
        match category {
            Some(category) => Ok(self.db.list_procedure_entries_by_category(category)?),
            None => Ok(self.db.list_procedure_entries()?),
        }
    }

    pub fn search_conditions(&self, query: &str) -> ChartResult<Vec<ConditionCatalogEntry>> {
        Ok(self.db.search_condition_entries(query, self.config.search_limit)?)
    }

    pub fn search_procedures(&self, query: &str) -> ChartResult<Vec<ProcedureCatalogEntry>> {
        Ok(self.db.search_procedure_entries(query, self.config.search_limit)?)
    }

    fn audit_log(&self) -> AuditLog<'a> {
        AuditLog::new(self.db, self.config.history_page_size)
    }
}
