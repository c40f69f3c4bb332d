//! Recently confirmed writes.
//!
//! The store may serve a read that predates a write it has just acknowledged.
//! For a short window after each confirmed write, a full reload keeps the
//! confirmed value of that cell instead of the stale row.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::client::cache::CellChange;
use crate::shared::{AttendanceRecord, CellKey};

#[derive(Debug)]
pub struct RecentWrites {
    window: Duration,
    entries: HashMap<CellKey, (Option<AttendanceRecord>, Instant)>,
}

impl RecentWrites {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: HashMap::new(),
        }
    }

    pub fn record(&mut self, changes: &[CellChange], now: Instant) {
        if self.window.is_zero() {
            return;
        }
        self.prune(now);
        for change in changes {
            self.entries.insert(change.key.clone(), (change.next.clone(), now));
        }
    }

    fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.entries
            .retain(|_, (_, confirmed_at)| now.saturating_duration_since(*confirmed_at) < window);
    }

    /// Overlay still-fresh confirmed writes on a freshly loaded record set.
    pub fn merge_into(&mut self, loaded: Vec<AttendanceRecord>, now: Instant) -> Vec<AttendanceRecord> {
        self.prune(now);
        if self.entries.is_empty() {
            return loaded;
        }

        let before = loaded.len();
        let mut merged: Vec<AttendanceRecord> = loaded
            .into_iter()
            .filter(|record| !self.entries.contains_key(&record.key()))
            .collect();
        let shadowed = before - merged.len();
        merged.extend(self.entries.values().filter_map(|(record, _)| record.clone()));

        tracing::debug!(
            "[SYNC] kept {} recent writes over reload ({} loaded rows shadowed)",
            self.entries.len(),
            shadowed
        );
        merged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
