//! Chart history (audit) models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::patient::ActorRef;

/// Kind of chart mutation recorded in history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    AddCondition,
    UpdateCondition,
    RemoveCondition,
    AddProcedure,
    UpdateProcedure,
    RemoveProcedure,
    AddProcedureNote,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::AddCondition => "add_condition",
            HistoryAction::UpdateCondition => "update_condition",
            HistoryAction::RemoveCondition => "remove_condition",
            HistoryAction::AddProcedure => "add_procedure",
            HistoryAction::UpdateProcedure => "update_procedure",
            HistoryAction::RemoveProcedure => "remove_procedure",
            HistoryAction::AddProcedureNote => "add_procedure_note",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add_condition" => Some(HistoryAction::AddCondition),
            "update_condition" => Some(HistoryAction::UpdateCondition),
            "remove_condition" => Some(HistoryAction::RemoveCondition),
            "add_procedure" => Some(HistoryAction::AddProcedure),
            "update_procedure" => Some(HistoryAction::UpdateProcedure),
            "remove_procedure" => Some(HistoryAction::RemoveProcedure),
            "add_procedure_note" => Some(HistoryAction::AddProcedureNote),
            _ => None,
        }
    }

    pub fn category(&self) -> HistoryCategory {
        match self {
            HistoryAction::AddCondition
            | HistoryAction::UpdateCondition
            | HistoryAction::RemoveCondition => HistoryCategory::Conditions,
            _ => HistoryCategory::Procedures,
        }
    }
}

/// Coarse grouping of history actions used for filtering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HistoryCategory {
    Conditions,
    Procedures,
}

impl HistoryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryCategory::Conditions => "conditions",
            HistoryCategory::Procedures => "procedures",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "conditions" => Some(HistoryCategory::Conditions),
            "procedures" => Some(HistoryCategory::Procedures),
            _ => None,
        }
    }
}

/// A history entry not yet written to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryEntry {
    pub patient_id: String,
    /// `None` for general procedures
    pub tooth_number: Option<String>,
    pub action: HistoryAction,
    /// Snapshot of the affected entity
    pub details: serde_json::Value,
    pub actor: ActorRef,
}

/// An immutable record of one chart mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartHistoryEntry {
    /// Unique entry ID
    pub id: String,
    /// Ledger insertion order, used to break timestamp ties
    pub sequence: i64,
    pub patient_id: String,
    /// Tooth the mutation applied to, `None` for general procedures
    pub tooth_number: Option<String>,
    pub action: HistoryAction,
    pub category: HistoryCategory,
    /// Snapshot of the relevant fields at the time of the action
    pub details: serde_json::Value,
    pub actor: ActorRef,
    /// UTC timestamp, fixed-width RFC 3339 with microseconds
    pub timestamp: String,
    /// Hash of the previous entry for this patient
    pub prev_hash: Option<String>,
    /// SHA-256 over `prev_hash` and this entry's canonical JSON
    pub entry_hash: String,
}

/// Filters for history queries. Dates are inclusive whole days (UTC).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub tooth_number: Option<String>,
    pub action: Option<HistoryAction>,
    pub category: Option<HistoryCategory>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl HistoryFilter {
    pub fn tooth(mut self, tooth_number: impl Into<String>) -> Self {
        self.tooth_number = Some(tooth_number.into());
        self
    }

    pub fn action(mut self, action: HistoryAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn category(mut self, category: HistoryCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trip_names() {
        for action in [
            HistoryAction::AddCondition,
            HistoryAction::UpdateCondition,
            HistoryAction::RemoveCondition,
            HistoryAction::AddProcedure,
            HistoryAction::UpdateProcedure,
            HistoryAction::RemoveProcedure,
            HistoryAction::AddProcedureNote,
        ] {
            assert_eq!(HistoryAction::parse(action.as_str()), Some(action));
        }
    }

    #[test]
    fn test_categories() {
        assert_eq!(HistoryAction::RemoveCondition.category(), HistoryCategory::Conditions);
        assert_eq!(HistoryAction::AddProcedureNote.category(), HistoryCategory::Procedures);
    }
}
