//! Clinic access checks consulted before every chart call.

use crate::db::Database;
use crate::error::{ChartError, ChartResult};
use crate::models::{ChartContext, Patient};

/// Decides whether an actor may work within a clinic.
///
/// Implemented by the host's session layer. A refusal reason is surfaced
/// to the caller unchanged.
pub trait ClinicAccess: Send + Sync {
    fn authorize(&self, ctx: &ChartContext) -> Result<(), String>;
}

/// Admits every actor.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccess;

impl ClinicAccess for OpenAccess {
    fn authorize(&self, _ctx: &ChartContext) -> Result<(), String> {
        Ok(())
    }
}

/// Authorize the context and load the patient it addresses.
///
/// Patients registered to another clinic are reported as not found.
pub(crate) fn authorize_patient(
    db: &Database,
    access: &dyn ClinicAccess,
    ctx: &ChartContext,
    patient_id: &str,
) -> ChartResult<Patient> {
    access.authorize(ctx).map_err(ChartError::Unauthorized)?;
    db.get_patient(patient_id)?
        .filter(|p| p.clinic_id == ctx.clinic_id)
        .ok_or_else(|| ChartError::PatientNotFound(patient_id.to_string()))
}
