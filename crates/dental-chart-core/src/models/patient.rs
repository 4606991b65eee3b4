//! Patient, actor and request context models.

use serde::{Deserialize, Serialize};

/// A patient whose chart is held by this store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Patient identifier
    pub patient_id: String,
    /// Owning clinic
    pub clinic_id: String,
    /// Display name
    pub name: String,
    /// Creation timestamp
    pub created_at: String,
}

impl Patient {
    /// Create a new patient with a generated ID.
    pub fn new(clinic_id: String, name: String) -> Self {
        Self {
            patient_id: uuid::Uuid::new_v4().to_string(),
            clinic_id,
            name,
            created_at: super::now_timestamp(),
        }
    }
}

/// Reference to a staff member.
///
/// Upstream payloads send either a bare ID or an embedded user object; both
/// are normalized into this one shape at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActorRef {
    /// User identifier
    pub id: String,
    /// Full name, when the caller embedded it
    pub display_name: Option<String>,
}

impl ActorRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    pub fn with_name(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: Some(name.into()),
        }
    }

    /// Name for display, falling back to the ID.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

/// Explicit per-call context: which clinic is acting and who is acting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartContext {
    pub clinic_id: String,
    pub actor: ActorRef,
}

impl ChartContext {
    pub fn new(clinic_id: impl Into<String>, actor: ActorRef) -> Self {
        Self {
            clinic_id: clinic_id.into(),
            actor,
        }
    }
}
