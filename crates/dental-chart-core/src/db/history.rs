//! Chart history database operations.
//!
//! Rows are insert-only; the schema aborts any UPDATE or DELETE.

use rusqlite::{params, params_from_iter, types::Value, OptionalExtension};

use super::{actor_columns, actor_from_columns, Database, DbError, DbResult};
use crate::models::{day_bounds, ChartHistoryEntry, HistoryAction, HistoryCategory, HistoryFilter};

/// Keyset position in a newest-first history scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPosition {
    pub timestamp: String,
    pub sequence: i64,
}

impl From<&ChartHistoryEntry> for HistoryPosition {
    fn from(entry: &ChartHistoryEntry) -> Self {
        Self {
            timestamp: entry.timestamp.clone(),
            sequence: entry.sequence,
        }
    }
}

const SELECT_HISTORY: &str = r#"
    SELECT seq, id, patient_id, tooth_number, action, category, details,
           actor_id, actor_name, timestamp, prev_hash, entry_hash
    FROM chart_history
"#;

impl Database {
    /// Append a history entry. Returns the assigned sequence number.
    pub fn insert_history_entry(&self, entry: &ChartHistoryEntry) -> DbResult<i64> {
        let (actor_id, actor_name) = actor_columns(&entry.actor);
        let details = serde_json::to_string(&entry.details)?;

        self.conn.execute(
            r#"
            INSERT INTO chart_history (
                id, patient_id, tooth_number, action, category, details,
                actor_id, actor_name, timestamp, prev_hash, entry_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                entry.id,
                entry.patient_id,
                entry.tooth_number,
                entry.action.as_str(),
                entry.category.as_str(),
                details,
                actor_id,
                actor_name,
                entry.timestamp,
                entry.prev_hash,
                entry.entry_hash,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Hash of the most recently appended entry for a patient.
    pub fn latest_history_hash(&self, patient_id: &str) -> DbResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT entry_hash FROM chart_history WHERE patient_id = ? ORDER BY seq DESC LIMIT 1",
                [patient_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Timestamp of the newest entry for a patient.
    pub fn latest_history_timestamp(&self, patient_id: &str) -> DbResult<Option<String>> {
        self.conn
            .query_row(
                "SELECT MAX(timestamp) FROM chart_history WHERE patient_id = ?",
                [patient_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn count_history_entries(&self, patient_id: &str) -> DbResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM chart_history WHERE patient_id = ?",
            [patient_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// One page of history, newest first, strictly after `after` when given.
    pub fn query_history_page(
        &self,
        patient_id: &str,
        filter: &HistoryFilter,
        after: Option<&HistoryPosition>,
        limit: usize,
    ) -> DbResult<Vec<ChartHistoryEntry>> {
        let mut sql = format!("{} WHERE patient_id = ?", SELECT_HISTORY);
        let mut args: Vec<Value> = vec![Value::Text(patient_id.to_string())];

        if let Some(tooth) = &filter.tooth_number {
            sql.push_str(" AND tooth_number = ?");
            args.push(Value::Text(tooth.clone()));
        }
        if let Some(action) = filter.action {
            sql.push_str(" AND action = ?");
            args.push(Value::Text(action.as_str().to_string()));
        }
        if let Some(category) = filter.category {
            sql.push_str(" AND category = ?");
            args.push(Value::Text(category.as_str().to_string()));
        }
        let (lower, upper) = day_bounds(filter.date_from, filter.date_to);
        if let Some(lower) = lower {
            sql.push_str(" AND timestamp >= ?");
            args.push(Value::Text(lower));
        }
        if let Some(upper) = upper {
            sql.push_str(" AND timestamp < ?");
            args.push(Value::Text(upper));
        }
        if let Some(pos) = after {
            sql.push_str(" AND (timestamp < ? OR (timestamp = ? AND seq < ?))");
            args.push(Value::Text(pos.timestamp.clone()));
            args.push(Value::Text(pos.timestamp.clone()));
            args.push(Value::Integer(pos.sequence));
        }
        sql.push_str(" ORDER BY timestamp DESC, seq DESC LIMIT ?");
        args.push(Value::Integer(limit as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(args), map_history_row)?;

        let mut entries: Vec<ChartHistoryEntry> = Vec::new();
        for row in rows {
            entries.push(row?.try_into()?);
        }
        Ok(entries)
    }

    /// Every entry for a patient in insertion order.
    pub fn list_history_chain(&self, patient_id: &str) -> DbResult<Vec<ChartHistoryEntry>> {
        let sql = format!("{} WHERE patient_id = ? ORDER BY seq ASC", SELECT_HISTORY);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([patient_id], map_history_row)?;

        let mut entries: Vec<ChartHistoryEntry> = Vec::new();
        for row in rows {
            entries.push(row?.try_into()?);
        }
        Ok(entries)
    }
}

fn map_history_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HistoryRow> {
    Ok(HistoryRow {
        seq: row.get(0)?,
        id: row.get(1)?,
        patient_id: row.get(2)?,
        tooth_number: row.get(3)?,
        action: row.get(4)?,
        category: row.get(5)?,
        details: row.get(6)?,
        actor_id: row.get(7)?,
        actor_name: row.get(8)?,
        timestamp: row.get(9)?,
        prev_hash: row.get(10)?,
        entry_hash: row.get(11)?,
    })
}

/// Intermediate row struct for database mapping.
struct HistoryRow {
    seq: i64,
    id: String,
    patient_id: String,
    tooth_number: Option<String>,
    action: String,
    category: String,
    details: String,
    actor_id: String,
    actor_name: Option<String>,
    timestamp: String,
    prev_hash: Option<String>,
    entry_hash: String,
}

impl TryFrom<HistoryRow> for ChartHistoryEntry {
    type Error = DbError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let action = HistoryAction::parse(&row.action)
            .ok_or_else(|| DbError::Constraint(format!("Unknown history action: {}", row.action)))?;
        let category = HistoryCategory::parse(&row.category).ok_or_else(|| {
            DbError::Constraint(format!("Unknown history category: {}", row.category))
        })?;

        Ok(ChartHistoryEntry {
            id: row.id,
            sequence: row.seq,
            patient_id: row.patient_id,
            tooth_number: row.tooth_number,
            action,
            category,
            details: serde_json::from_str(&row.details)?,
            actor: actor_from_columns(row.actor_id, row.actor_name),
            timestamp: row.timestamp,
            prev_hash: row.prev_hash,
            entry_hash: row.entry_hash,
        })
    }
}
