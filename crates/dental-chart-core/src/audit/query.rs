//! Lazy, restartable history queries.

use std::collections::VecDeque;

use crate::db::{Database, HistoryPosition};
use crate::error::ChartResult;
use crate::models::{ChartHistoryEntry, HistoryFilter};

/// Newest-first iterator over a patient's history.
///
/// Pages are fetched on demand by keyset `(timestamp, sequence)`, so entries
/// appended mid-scan never shift or repeat rows already yielded.
pub struct HistoryCursor<'a> {
    db: &'a Database,
    patient_id: String,
    filter: HistoryFilter,
    page_size: usize,
    buffer: VecDeque<ChartHistoryEntry>,
    position: Option<HistoryPosition>,
    exhausted: bool,
}

impl<'a> HistoryCursor<'a> {
    pub(crate) fn new(
        db: &'a Database,
        patient_id: impl Into<String>,
        filter: HistoryFilter,
        page_size: usize,
    ) -> Self {
        Self {
            db,
            patient_id: patient_id.into(),
            filter,
            page_size: page_size.max(1),
            buffer: VecDeque::new(),
            position: None,
            exhausted: false,
        }
    }

    /// Start over from the newest entry, re-reading current state.
    pub fn restart(&mut self) {
        self.buffer.clear();
        self.position = None;
        self.exhausted = false;
    }

    fn fill(&mut self) -> ChartResult<()> {
        let page = self.db.query_history_page(
            &self.patient_id,
            &self.filter,
            self.position.as_ref(),
            self.page_size,
        )?;
        if page.len() < self.page_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.position = Some(HistoryPosition::from(last));
        }
        tracing::debug!(
            patient_id = %self.patient_id,
            fetched = page.len(),
            "history page fetched"
        );
        self.buffer.extend(page);
        Ok(())
    }
}

impl Iterator for HistoryCursor<'_> {
    type Item = ChartResult<ChartHistoryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}
