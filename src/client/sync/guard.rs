//! In-flight registry.
//!
//! Tracks which cells have a write outstanding and whether a grid-wide batch
//! is running. Locks are released when the returned guard drops.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use super::SyncError;
use crate::shared::CellKey;

#[derive(Debug, Default)]
struct State {
    cells: HashSet<CellKey>,
    batch: bool,
}

#[derive(Debug, Default)]
pub struct InFlight {
    state: Mutex<State>,
}

/// Releases its locks on drop
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    cells: Vec<CellKey>,
    batch: bool,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fail with `Busy` if the cell cannot be touched right now.
    pub fn check_cell(&self, key: &CellKey) -> Result<(), SyncError> {
        let state = self.lock();
        if state.batch {
            return Err(SyncError::Busy { key: None });
        }
        if state.cells.contains(key) {
            return Err(SyncError::Busy {
                key: Some(key.clone()),
            });
        }
        Ok(())
    }

    pub fn lock_cell(&self, key: &CellKey) -> Result<InFlightGuard<'_>, SyncError> {
        let mut state = self.lock();
        if state.batch {
            return Err(SyncError::Busy { key: None });
        }
        if !state.cells.insert(key.clone()) {
            return Err(SyncError::Busy {
                key: Some(key.clone()),
            });
        }
        Ok(InFlightGuard {
            owner: self,
            cells: vec![key.clone()],
            batch: false,
        })
    }

    /// Grid-wide lock for a batch touching `keys`.
    pub fn lock_batch(&self, keys: &[CellKey]) -> Result<InFlightGuard<'_>, SyncError> {
        let mut state = self.lock();
        if state.batch {
            return Err(SyncError::Busy { key: None });
        }
        if let Some(key) = keys.iter().find(|key| state.cells.contains(*key)) {
            return Err(SyncError::Busy {
                key: Some(key.clone()),
            });
        }
        state.batch = true;
        Ok(InFlightGuard {
            owner: self,
            cells: Vec::new(),
            batch: true,
        })
    }

    /// Grid-wide lock that requires nothing else to be in flight.
    pub fn lock_all(&self) -> Result<InFlightGuard<'_>, SyncError> {
        let mut state = self.lock();
        if state.batch {
            return Err(SyncError::Busy { key: None });
        }
        if let Some(key) = state.cells.iter().next() {
            return Err(SyncError::Busy {
                key: Some(key.clone()),
            });
        }
        state.batch = true;
        Ok(InFlightGuard {
            owner: self,
            cells: Vec::new(),
            batch: true,
        })
    }

    pub fn is_cell_locked(&self, key: &CellKey) -> bool {
        let state = self.lock();
        state.batch || state.cells.contains(key)
    }

    pub fn is_batch_in_flight(&self) -> bool {
        self.lock().batch
    }

    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        !state.batch && state.cells.is_empty()
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.owner.lock();
        for key in &self.cells {
            state.cells.remove(key);
        }
        if self.batch {
            state.batch = false;
        }
    }
}
