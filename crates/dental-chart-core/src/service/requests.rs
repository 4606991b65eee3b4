//! Caller-facing request shapes for chart mutations.
//!
//! Requests carry raw strings as they arrive from the host; the mutation
//! service validates them into store drafts before anything is written.

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};
use crate::models::ActorRef;

/// What a new condition or procedure refers to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EntrySelection {
    Catalog(i64),
    Custom {
        name: String,
        /// Synthesized when absent
        code: Option<String>,
        description: Option<String>,
    },
}

impl EntrySelection {
    /// Build a selection from the flat field set used on the wire.
    ///
    /// Exactly one of `catalog_id` or `custom_name` must be present. Blank
    /// strings count as absent.
    pub fn from_fields(
        catalog_id: Option<i64>,
        custom_name: Option<String>,
        custom_code: Option<String>,
        custom_description: Option<String>,
    ) -> ChartResult<Self> {
        let custom_name = non_blank(custom_name);
        let custom_code = non_blank(custom_code);
        let custom_description = non_blank(custom_description);

        match (catalog_id, custom_name) {
            (Some(_), Some(_)) => Err(ChartError::invalid(
                "catalog_id",
                "a catalog entry and a custom name cannot both be given",
            )),
            (Some(id), None) => {
                if custom_code.is_some() || custom_description.is_some() {
                    return Err(ChartError::invalid(
                        "catalog_id",
                        "custom fields cannot accompany a catalog entry",
                    ));
                }
                Ok(EntrySelection::Catalog(id))
            }
            (None, Some(name)) => Ok(EntrySelection::Custom {
                name,
                code: custom_code,
                description: custom_description,
            }),
            (None, None) => Err(ChartError::invalid(
                "custom_name",
                "either a catalog entry or a custom name is required",
            )),
        }
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Patch semantics for free text: absent keeps, blank clears.
pub(crate) fn notes_change(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| non_blank(Some(v)))
}

/// Chart a condition on a tooth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddConditionRequest {
    pub tooth_number: String,
    /// Optional cross-check against the tooth identity
    pub dentition_type: Option<String>,
    pub entry: EntrySelection,
    pub surface: String,
    pub severity: Option<String>,
    pub notes: Option<String>,
}

/// Partial condition update. Absent fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConditionPatch {
    pub surface: Option<String>,
    pub severity: Option<String>,
    /// A blank string clears the notes
    pub notes: Option<String>,
}

/// Chart a procedure on a tooth.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddProcedureRequest {
    pub tooth_number: String,
    pub dentition_type: Option<String>,
    pub entry: EntrySelection,
    pub surface: String,
    /// Defaults to `planned`
    pub status: Option<String>,
    /// Decimal string; defaults to the catalog price
    pub price: Option<String>,
    /// `YYYY-MM-DD`
    pub date_performed: String,
    pub performed_by: Option<ActorRef>,
    pub notes: Option<String>,
}

/// Partial procedure update, tooth-bound or general.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcedurePatch {
    pub surface: Option<String>,
    pub status: Option<String>,
    pub price: Option<String>,
    pub date_performed: Option<String>,
    pub performed_by: Option<ActorRef>,
    /// A blank string clears the notes
    pub notes: Option<String>,
}

/// Chart a procedure against the patient as a whole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddGeneralProcedureRequest {
    pub entry: EntrySelection,
    /// Defaults to `completed`
    pub status: Option<String>,
    pub price: Option<String>,
    pub date_performed: String,
    pub performed_by: Option<ActorRef>,
    pub notes: Option<String>,
}

/// Append a progress note to a procedure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddNoteRequest {
    pub procedure_id: String,
    pub note: String,
    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub appointment_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_selection() {
        let selection = EntrySelection::from_fields(Some(3), None, None, None).unwrap();
        assert_eq!(selection, EntrySelection::Catalog(3));
    }

    #[test]
    fn test_custom_selection_trims() {
        let selection =
            EntrySelection::from_fields(None, Some("  Unusual Wear ".into()), Some(" ".into()), None)
                .unwrap();
        assert_eq!(
            selection,
            EntrySelection::Custom {
                name: "Unusual Wear".into(),
                code: None,
                description: None,
            }
        );
    }

    #[test]
    fn test_mixed_selection_rejected() {
        let err = EntrySelection::from_fields(Some(1), Some("Wear".into()), None, None).unwrap_err();
        assert_eq!(err.field(), Some("catalog_id"));

        let err = EntrySelection::from_fields(Some(1), None, Some("X1".into()), None).unwrap_err();
        assert_eq!(err.field(), Some("catalog_id"));
    }

    #[test]
    fn test_empty_selection_rejected() {
        let err = EntrySelection::from_fields(None, Some("   ".into()), None, None).unwrap_err();
        assert_eq!(err.field(), Some("custom_name"));
    }
}
