//! Append-only chart history ledger.

use crate::db::{Database, DbError};
use crate::error::ChartResult;
use crate::models::{now_timestamp, ChartHistoryEntry, HistoryFilter, NewHistoryEntry};

use super::hash::{canonical_json, chain_hash, verify_entries, ChainVerification};
use super::query::HistoryCursor;

/// History ledger bound to one database.
pub struct AuditLog<'a> {
    db: &'a Database,
    page_size: usize,
}

impl<'a> AuditLog<'a> {
    pub fn new(db: &'a Database, page_size: usize) -> Self {
        Self { db, page_size }
    }

    /// Append one entry, linking it to the patient's previous entry.
    ///
    /// Fails only when storage fails. Callers running inside a transaction
    /// must roll back on error.
    pub fn append(&self, new: NewHistoryEntry) -> ChartResult<ChartHistoryEntry> {
        let prev_hash = self.db.latest_history_hash(&new.patient_id)?;
        let mut entry = ChartHistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            sequence: 0,
            patient_id: new.patient_id,
            tooth_number: new.tooth_number,
            category: new.action.category(),
            action: new.action,
            details: new.details,
            actor: new.actor,
            timestamp: now_timestamp(),
            prev_hash,
            entry_hash: String::new(),
        };
        let canonical = canonical_json(&entry).map_err(DbError::from)?;
        entry.entry_hash = chain_hash(entry.prev_hash.as_deref(), &canonical);
        entry.sequence = self.db.insert_history_entry(&entry)?;
        Ok(entry)
    }

    /// Lazy newest-first sequence of matching entries.
    pub fn query(&self, patient_id: &str, filter: HistoryFilter) -> HistoryCursor<'a> {
        HistoryCursor::new(self.db, patient_id, filter, self.page_size)
    }

    /// Collect every matching entry, newest first.
    pub fn entries(&self, patient_id: &str, filter: HistoryFilter) -> ChartResult<Vec<ChartHistoryEntry>> {
        self.query(patient_id, filter).collect()
    }

    pub fn count(&self, patient_id: &str) -> ChartResult<u64> {
        Ok(self.db.count_history_entries(patient_id)?)
    }

    /// Recompute the patient's hash chain from the first entry.
    pub fn verify_chain(&self, patient_id: &str) -> ChartResult<ChainVerification> {
        let entries = self.db.list_history_chain(patient_id)?;
        Ok(verify_entries(&entries).map_err(DbError::from)?)
    }
}
