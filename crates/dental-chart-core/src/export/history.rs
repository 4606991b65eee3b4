//! Chart history export for compliance review.

use serde::Serialize;

use crate::audit::ChainVerification;
use crate::models::{ChartHistoryEntry, HistoryFilter, Patient};

use super::escape_csv;

/// Export metadata.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryExportMetadata {
    pub patient_id: String,
    pub clinic_id: String,
    pub patient_name: String,
    /// Export timestamp
    pub exported_at: String,
    /// Tooth filter applied, if any
    pub tooth_number: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    /// Entries in the exported selection
    pub entry_count: usize,
    /// Entries in the patient's whole chain
    pub chain_length: u64,
    /// Hash of the newest entry in the whole chain
    pub chain_head: Option<String>,
    pub chain_intact: bool,
}

/// A patient's history, newest first, with the chain head it was read at.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryExport {
    pub metadata: HistoryExportMetadata,
    pub entries: Vec<ChartHistoryEntry>,
}

impl HistoryExport {
    pub fn new(
        patient: &Patient,
        filter: &HistoryFilter,
        entries: Vec<ChartHistoryEntry>,
        verification: ChainVerification,
    ) -> Self {
        Self {
            metadata: HistoryExportMetadata {
                patient_id: patient.patient_id.clone(),
                clinic_id: patient.clinic_id.clone(),
                patient_name: patient.name.clone(),
                exported_at: crate::models::now_timestamp(),
                tooth_number: filter.tooth_number.clone(),
                date_from: filter.date_from.map(|d| d.to_string()),
                date_to: filter.date_to.map(|d| d.to_string()),
                entry_count: entries.len(),
                chain_length: verification.entries,
                chain_intact: verification.is_intact(),
                chain_head: verification.head_hash,
            },
            entries,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Flat CSV; `details` is embedded as compact JSON.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("timestamp,patient_id,tooth_number,action,category,actor_id,actor_name,details,entry_hash\n");

        for entry in &self.entries {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{}\n",
                escape_csv(&entry.timestamp),
                escape_csv(&entry.patient_id),
                entry.tooth_number.as_deref().unwrap_or(""),
                entry.action.as_str(),
                entry.category.as_str(),
                escape_csv(&entry.actor.id),
                escape_csv(entry.actor.display_name.as_deref().unwrap_or("")),
                escape_csv(&entry.details.to_string()),
                entry.entry_hash,
            ));
        }

        csv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::db::Database;
    use crate::models::{ActorRef, HistoryAction, NewHistoryEntry};

    fn setup_db() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        let patient = Patient::new("clinic-1".into(), "Jane Doe".into());
        db.insert_patient(&patient).unwrap();
        (db, patient)
    }

    fn append(log: &AuditLog<'_>, patient: &Patient, tooth: Option<&str>) -> ChartHistoryEntry {
        log.append(NewHistoryEntry {
            patient_id: patient.patient_id.clone(),
            tooth_number: tooth.map(String::from),
            action: HistoryAction::AddCondition,
            details: serde_json::json!({ "condition_name": "Cavity", "surface": "mesial,distal" }),
            actor: ActorRef::with_name("u-1", "Dr. Smith"),
        })
        .unwrap()
    }

    #[test]
    fn test_export_metadata() {
        let (db, patient) = setup_db();
        let log = AuditLog::new(&db, 50);
        append(&log, &patient, Some("3"));
        let head = append(&log, &patient, Some("4"));

        let filter = HistoryFilter::default().tooth("3");
        let entries = log.entries(&patient.patient_id, filter.clone()).unwrap();
        let export = HistoryExport::new(&patient, &filter, entries, log.verify_chain(&patient.patient_id).unwrap());

        assert_eq!(export.metadata.entry_count, 1);
        assert_eq!(export.metadata.chain_length, 2);
        assert_eq!(export.metadata.chain_head, Some(head.entry_hash));
        assert_eq!(export.metadata.tooth_number.as_deref(), Some("3"));
        assert!(export.to_json().unwrap().contains("\"chain_intact\": true"));
    }

    #[test]
    fn test_export_csv_quotes_details() {
        let (db, patient) = setup_db();
        let log = AuditLog::new(&db, 50);
        append(&log, &patient, None);

        let entries = log.entries(&patient.patient_id, HistoryFilter::default()).unwrap();
        let export = HistoryExport::new(
            &patient,
            &HistoryFilter::default(),
            entries,
            log.verify_chain(&patient.patient_id).unwrap(),
        );
        let csv = export.to_csv();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains(",,add_condition,conditions,u-1,Dr. Smith,\"{"));
    }
}
