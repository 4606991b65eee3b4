//! Charted tooth condition models.

use serde::{Deserialize, Serialize};

use super::catalog::EntryReference;
use super::patient::ActorRef;
use super::surface::SurfaceSet;

/// Clinical severity of a condition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mild" => Some(Severity::Mild),
            "moderate" => Some(Severity::Moderate),
            "severe" => Some(Severity::Severe),
            _ => None,
        }
    }
}

/// A diagnosed condition recorded against one tooth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToothCondition {
    /// Unique condition ID
    pub id: String,
    /// Owning patient
    pub patient_id: String,
    /// Owning tooth identity
    pub tooth_number: String,
    /// Catalog entry or inline custom definition
    pub reference: EntryReference,
    /// Affected surfaces
    pub surfaces: SurfaceSet,
    /// Severity, if assessed
    pub severity: Option<Severity>,
    /// Free-text notes
    pub notes: Option<String>,
    pub created_by: ActorRef,
    pub created_at: String,
    pub updated_by: Option<ActorRef>,
    pub updated_at: Option<String>,
}

impl ToothCondition {
    /// Snapshot of the fields recorded in chart history.
    pub fn history_details(&self) -> serde_json::Value {
        serde_json::json!({
            "condition_id": self.id,
            "catalog_condition_id": self.reference.catalog_id(),
            "condition_name": self.reference.name(),
            "condition_code": self.reference.code(),
            "custom": self.reference.is_custom(),
            "surface": self.surfaces.to_wire(),
            "severity": self.severity.map(|s| s.as_str()),
            "notes": self.notes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parse() {
        assert_eq!(Severity::parse("Severe"), Some(Severity::Severe));
        assert_eq!(Severity::parse("critical"), None);
    }

    #[test]
    fn test_history_details() {
        let condition = ToothCondition {
            id: "c-1".into(),
            patient_id: "p-1".into(),
            tooth_number: "9".into(),
            reference: EntryReference::Catalog {
                catalog_id: 1,
                name: "Cavity".into(),
                code: "C01".into(),
            },
            surfaces: SurfaceSet::parse("occlusal").unwrap(),
            severity: Some(Severity::Moderate),
            notes: None,
            created_by: ActorRef::new("u-1"),
            created_at: "2024-03-01T10:00:00.000000Z".into(),
            updated_by: None,
            updated_at: None,
        };

        let details = condition.history_details();
        assert_eq!(details["condition_name"], "Cavity");
        assert_eq!(details["surface"], "occlusal");
        assert_eq!(details["severity"], "moderate");
        assert_eq!(details["custom"], false);
    }
}
