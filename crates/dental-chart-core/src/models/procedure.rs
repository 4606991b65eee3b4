//! Charted procedure models and the procedure status lifecycle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::catalog::{EntryReference, Price};
use super::patient::ActorRef;
use super::surface::SurfaceSet;

/// Procedure status.
///
/// ```text
/// planned ──► in_progress ──► completed
///    │             │
///    ├─────────────┼────────► completed
///    └─────────────┴────────► cancelled
/// ```
///
/// `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProcedureStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

/// Rejected status change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot move procedure from {from} to {to}")]
pub struct InvalidStatusTransition {
    pub from: &'static str,
    pub to: &'static str,
}

impl ProcedureStatus {
    pub const ALL: [ProcedureStatus; 4] = [
        ProcedureStatus::Planned,
        ProcedureStatus::InProgress,
        ProcedureStatus::Completed,
        ProcedureStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcedureStatus::Planned => "planned",
            ProcedureStatus::InProgress => "in_progress",
            ProcedureStatus::Completed => "completed",
            ProcedureStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "planned" => Some(ProcedureStatus::Planned),
            "in_progress" => Some(ProcedureStatus::InProgress),
            "completed" => Some(ProcedureStatus::Completed),
            "cancelled" => Some(ProcedureStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcedureStatus::Completed | ProcedureStatus::Cancelled)
    }

    /// Whether `next` is reachable from `self` in one step.
    pub fn can_transition_to(&self, next: ProcedureStatus) -> bool {
        use ProcedureStatus::*;
        matches!(
            (self, next),
            (Planned, InProgress)
                | (Planned, Completed)
                | (InProgress, Completed)
                | (Planned, Cancelled)
                | (InProgress, Cancelled)
        )
    }

    /// Apply a requested status.
    ///
    /// Requesting the current status of a non-terminal procedure is a no-op.
    /// Terminal procedures reject every request, including their own status.
    pub fn transition(self, next: ProcedureStatus) -> Result<ProcedureStatus, InvalidStatusTransition> {
        if self == next && !self.is_terminal() {
            return Ok(self);
        }
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidStatusTransition {
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

/// A dated progress note on a procedure. Notes are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressNote {
    /// Unique note ID
    pub id: String,
    /// Owning procedure
    pub procedure_id: String,
    /// Note text
    pub note: String,
    /// Appointment the note refers to (RFC 3339)
    pub appointment_date: String,
    pub created_by: ActorRef,
    pub created_at: String,
}

/// A treatment planned or performed for a patient.
///
/// `tooth_number` is `None` for general (whole-mouth) procedures, whose
/// surface set is always `all`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToothProcedure {
    /// Unique procedure ID
    pub id: String,
    /// Owning patient
    pub patient_id: String,
    /// Owning tooth identity, `None` for general procedures
    pub tooth_number: Option<String>,
    /// Catalog entry or inline custom definition
    pub reference: EntryReference,
    /// Treated surfaces
    pub surfaces: SurfaceSet,
    /// Lifecycle status
    pub status: ProcedureStatus,
    /// Charged amount; defaults from the catalog
    pub price: Option<Price>,
    /// Date performed or scheduled (YYYY-MM-DD)
    pub date_performed: String,
    /// Staff member who performed it
    pub performed_by: Option<ActorRef>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Progress notes, newest appointment first
    pub progress_notes: Vec<ProgressNote>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl ToothProcedure {
    pub fn is_general(&self) -> bool {
        self.tooth_number.is_none()
    }

    /// Snapshot of the fields recorded in chart history.
    pub fn history_details(&self) -> serde_json::Value {
        serde_json::json!({
            "procedure_id": self.id,
            "catalog_procedure_id": self.reference.catalog_id(),
            "procedure_name": self.reference.name(),
            "procedure_code": self.reference.code(),
            "custom": self.reference.is_custom(),
            "surface": self.surfaces.to_wire(),
            "status": self.status.as_str(),
            "price": self.price.map(|p| p.to_string()),
            "date_performed": self.date_performed,
            "notes": self.notes,
            "general": self.is_general(),
        })
    }
}
