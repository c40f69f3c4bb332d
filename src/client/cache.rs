//! # Attendance Cache
//!
//! In-memory mirror of the `attendance` table for the current session,
//! indexed by [`CellKey`]. A missing entry means the cell is unmarked.
//!
//! The cache itself is a plain synchronous structure: every mutation happens
//! in one call with no suspension point, so readers either see the state from
//! before a mutation or after it, never in between. Writers are the sync
//! engine only; consumers get read access through the engine.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::shared::{AttendanceRecord, CellKey, CellValue, StudentId};

/// Target state of one cell; `next: None` clears it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellChange {
    pub key: CellKey,
    pub next: Option<AttendanceRecord>,
}

/// Opaque copy of the whole cache
#[derive(Debug, Clone)]
pub struct CacheSnapshot(HashMap<CellKey, AttendanceRecord>);

/// Prior values of a set of cells, taken just before they are mutated
#[derive(Debug, Clone)]
pub struct CellSnapshot(Vec<(CellKey, Option<AttendanceRecord>)>);

impl CellSnapshot {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceCache {
    records: HashMap<CellKey, AttendanceRecord>,
}

impl AttendanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = AttendanceRecord>) -> Self {
        let mut cache = Self::new();
        cache.replace_all(records);
        cache
    }

    /// Swap in a freshly loaded record set. Later duplicates of a key win.
    pub fn replace_all(&mut self, records: impl IntoIterator<Item = AttendanceRecord>) {
        self.records = records
            .into_iter()
            .map(|record| (record.key(), record))
            .collect();
        tracing::debug!("[CACHE] rebuilt with {} records", self.records.len());
    }

    pub fn lookup(&self, key: &CellKey) -> Option<&AttendanceRecord> {
        self.records.get(key)
    }

    pub fn value(&self, key: &CellKey) -> Option<CellValue> {
        self.lookup(key).map(AttendanceRecord::value)
    }

    /// Optimistic primitive: drop whatever the cell holds and, unless `value`
    /// is `None`, insert the new record.
    pub fn apply_local_mutation(&mut self, key: CellKey, value: Option<CellValue>, author_id: Option<String>) {
        self.records.remove(&key);
        if let Some(value) = value {
            let record = AttendanceRecord::new(key.clone(), value, author_id);
            self.records.insert(key, record);
        }
    }

    /// Apply a set of changes as one state transition.
    pub fn apply(&mut self, changes: &[CellChange]) {
        for change in changes {
            self.records.remove(&change.key);
        }
        for change in changes {
            if let Some(record) = &change.next {
                self.records.insert(change.key.clone(), record.clone());
            }
        }
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot(self.records.clone())
    }

    pub fn restore(&mut self, snapshot: CacheSnapshot) {
        self.records = snapshot.0;
    }

    /// Record the current value of each key.
    pub fn capture<'a>(&self, keys: impl IntoIterator<Item = &'a CellKey>) -> CellSnapshot {
        CellSnapshot(
            keys.into_iter()
                .map(|key| (key.clone(), self.records.get(key).cloned()))
                .collect(),
        )
    }

    /// Put every captured cell back exactly as it was.
    pub fn restore_cells(&mut self, snapshot: CellSnapshot) {
        for (key, previous) in snapshot.0 {
            match previous {
                Some(record) => {
                    self.records.insert(key, record);
                }
                None => {
                    self.records.remove(&key);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &AttendanceRecord> {
        self.records.values()
    }

    pub fn records_for_student<'a>(&'a self, student_id: &'a StudentId) -> impl Iterator<Item = &'a AttendanceRecord> {
        self.records
            .values()
            .filter(move |record| &record.student_id == student_id)
    }

    pub fn records_on(&self, date: NaiveDate) -> impl Iterator<Item = &AttendanceRecord> {
        self.records.values().filter(move |record| record.date == date)
    }
}
