//! # Draft Overlay
//!
//! Pending, uncommitted cell edits for the grid-editing mode. A draft shadows
//! the cache when reading: the effective value of a cell is its draft if one
//! exists, otherwise the cached record, otherwise unmarked. Drafts never touch
//! the cache or the store; they are committed as one batch by the engine.

use std::collections::HashMap;

use crate::client::cache::AttendanceCache;
use crate::shared::date::format_day;
use crate::shared::{AttendanceUpdate, CellKey, CellValue};

#[derive(Debug, Clone, Default)]
pub struct DraftOverlay {
    /// `None` drafts a cleared cell
    entries: HashMap<CellKey, Option<CellValue>>,
}

impl DraftOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pending change; the cell becomes dirty.
    pub fn set_draft(&mut self, key: CellKey, value: Option<CellValue>) {
        self.entries.insert(key, value);
    }

    /// Drop the pending change of one cell.
    pub fn discard(&mut self, key: &CellKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn draft(&self, key: &CellKey) -> Option<&Option<CellValue>> {
        self.entries.get(key)
    }

    pub fn effective_value(&self, key: &CellKey, cache: &AttendanceCache) -> Option<CellValue> {
        match self.entries.get(key) {
            Some(drafted) => drafted.clone(),
            None => cache.value(key),
        }
    }

    pub fn is_dirty(&self, key: &CellKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            tracing::debug!("[GRID] discarding {} pending drafts", self.entries.len());
        }
        self.entries.clear();
    }

    /// Pending changes as batch updates, ordered by key.
    pub fn to_updates(&self) -> Vec<AttendanceUpdate> {
        let mut keys: Vec<&CellKey> = self.entries.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| {
                let (status, note) = match &self.entries[key] {
                    Some(value) => (Some(value.status), value.note.clone()),
                    None => (None, String::new()),
                };
                AttendanceUpdate::new(key.student_id.clone(), format_day(key.date), status, note)
            })
            .collect()
    }
}
