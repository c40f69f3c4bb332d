//! Pure planning of sync operations.
//!
//! Turns validated cell targets into the local cache changes and the ordered
//! remote effects that realize them. Nothing here touches the cache or the
//! store, so the ordering rules can be tested without either.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::client::cache::CellChange;
use crate::shared::{AttendanceRecord, AttendanceRow, AttendanceUpdate, CellKey, CellValue, SharedError, StudentId};

/// One remote call of a plan, executed in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEffect {
    /// Delete the row of one cell
    Delete { key: CellKey },
    /// Delete the rows of several students on one day
    DeleteIn { date: NaiveDate, student_ids: Vec<StudentId> },
    /// Insert-or-replace rows on the attendance conflict target
    Upsert { rows: Vec<AttendanceRow> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    pub changes: Vec<CellChange>,
    pub effects: Vec<RemoteEffect>,
}

impl SyncPlan {
    pub fn keys(&self) -> impl Iterator<Item = &CellKey> {
        self.changes.iter().map(|change| &change.key)
    }

    pub fn upserted(&self) -> usize {
        self.changes.iter().filter(|change| change.next.is_some()).count()
    }

    pub fn deleted(&self) -> usize {
        self.changes.iter().filter(|change| change.next.is_none()).count()
    }
}

/// Validate every update and collapse repeats of a cell; the last one wins.
/// Keys keep the order of their first appearance.
pub fn resolve(updates: &[AttendanceUpdate]) -> Result<Vec<(CellKey, Option<CellValue>)>, SharedError> {
    let mut resolved: Vec<(CellKey, Option<CellValue>)> = Vec::with_capacity(updates.len());
    let mut positions: HashMap<CellKey, usize> = HashMap::new();

    for update in updates {
        let (key, value) = update.validate()?;
        match positions.get(&key) {
            Some(&index) => resolved[index].1 = value,
            None => {
                positions.insert(key.clone(), resolved.len());
                resolved.push((key, value));
            }
        }
    }
    Ok(resolved)
}

fn change(key: CellKey, value: Option<CellValue>, author_id: &str) -> CellChange {
    let next = value.map(|value| AttendanceRecord::new(key.clone(), value, Some(author_id.to_string())));
    CellChange { key, next }
}

/// Single cell: a keyed delete when clearing, otherwise a one-row upsert.
pub fn plan_single(key: CellKey, value: Option<CellValue>, author_id: &str) -> SyncPlan {
    let change = change(key, value, author_id);
    let effect = match &change.next {
        Some(record) => RemoteEffect::Upsert {
            rows: vec![record.to_row()],
        },
        None => RemoteEffect::Delete {
            key: change.key.clone(),
        },
    };
    SyncPlan {
        changes: vec![change],
        effects: vec![effect],
    }
}

/// Batch: every clear of a day goes out as one delete, all deletes run
/// before the single upsert of every marked cell.
pub fn plan_batch(cells: Vec<(CellKey, Option<CellValue>)>, author_id: &str) -> SyncPlan {
    let changes: Vec<CellChange> = cells
        .into_iter()
        .map(|(key, value)| change(key, value, author_id))
        .collect();

    let mut clears: BTreeMap<NaiveDate, Vec<StudentId>> = BTreeMap::new();
    let mut rows = Vec::new();
    for change in &changes {
        match &change.next {
            Some(record) => rows.push(record.to_row()),
            None => clears
                .entry(change.key.date)
                .or_default()
                .push(change.key.student_id.clone()),
        }
    }

    let mut effects: Vec<RemoteEffect> = clears
        .into_iter()
        .map(|(date, student_ids)| RemoteEffect::DeleteIn { date, student_ids })
        .collect();
    if !rows.is_empty() {
        effects.push(RemoteEffect::Upsert { rows });
    }

    SyncPlan { changes, effects }
}
