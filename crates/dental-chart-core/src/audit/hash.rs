//! Hash chain over a patient's history entries.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::models::ChartHistoryEntry;

/// Compute SHA-256 hash of data, hex-encoded.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Canonical JSON of the hashed fields of an entry.
///
/// `serde_json` maps sort their keys, so the output is stable for equal
/// content. Sequence and hashes are excluded.
pub fn canonical_json(entry: &ChartHistoryEntry) -> Result<String, serde_json::Error> {
    let value = serde_json::json!({
        "id": entry.id,
        "patient_id": entry.patient_id,
        "tooth_number": entry.tooth_number,
        "action": entry.action.as_str(),
        "category": entry.category.as_str(),
        "details": entry.details,
        "actor_id": entry.actor.id,
        "actor_name": entry.actor.display_name,
        "timestamp": entry.timestamp,
    });
    serde_json::to_string(&value)
}

/// `SHA-256(prev_hash || canonical_json)`; an absent predecessor hashes as empty.
pub fn chain_hash(prev_hash: Option<&str>, canonical: &str) -> String {
    let mut data = Vec::with_capacity(64 + canonical.len());
    data.extend_from_slice(prev_hash.unwrap_or("").as_bytes());
    data.extend_from_slice(canonical.as_bytes());
    hash_data(&data)
}

/// Outcome of re-walking a patient's chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainVerification {
    /// Entries checked
    pub entries: u64,
    /// Hash of the last entry, if any
    pub head_hash: Option<String>,
    /// ID of the first entry whose link or hash does not match
    pub first_broken: Option<String>,
}

impl ChainVerification {
    pub fn is_intact(&self) -> bool {
        self.first_broken.is_none()
    }
}

/// Verify entries given in insertion order.
pub fn verify_entries(entries: &[ChartHistoryEntry]) -> Result<ChainVerification, serde_json::Error> {
    let mut prev: Option<&str> = None;
    for entry in entries {
        let expected = chain_hash(prev, &canonical_json(entry)?);
        if entry.prev_hash.as_deref() != prev || entry.entry_hash != expected {
            return Ok(ChainVerification {
                entries: entries.len() as u64,
                head_hash: entries.last().map(|e| e.entry_hash.clone()),
                first_broken: Some(entry.id.clone()),
            });
        }
        prev = Some(entry.entry_hash.as_str());
    }
    Ok(ChainVerification {
        entries: entries.len() as u64,
        head_hash: prev.map(String::from),
        first_broken: None,
    })
}
