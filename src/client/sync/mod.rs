//! # Sync Engine
//!
//! Optimistic synchronization between the local [`AttendanceCache`] and the
//! remote store. Every mutation is applied locally first, in a single step,
//! and then written remotely. A failed write puts back exactly the cells the
//! operation touched and surfaces a [`SyncError`].
//!
//! ## Paths
//!
//! - **Single cell** ([`SyncEngine::sync_one`]): a keyed delete when the cell is
//!   cleared, otherwise a one-row upsert on `(student_id, attendance_date)`.
//! - **Batch** ([`SyncEngine::sync_batch`]): repeats of a cell collapse to the
//!   last update; clears become one delete per day; all marks go out as one
//!   upsert after the deletes.
//! - **Drafts** ([`SyncEngine::set_draft`], [`SyncEngine::commit_drafts`]):
//!   pending edits shadow the cache until committed through the batch path.
//!
//! ## Concurrency
//!
//! A cell with a write in flight rejects further syncs with
//! [`SyncError::Busy`]; a batch or a full reload locks the whole grid. Locks
//! are released on every exit path, including rollback.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rollcall::client::remote::{Identity, MemoryStore};
//! use rollcall::client::sync::SyncEngine;
//! use rollcall::shared::{AppConfig, AttendanceStatus, AttendanceUpdate};
//!
//! # async fn demo() -> Result<(), rollcall::client::sync::SyncError> {
//! let store = Arc::new(MemoryStore::new().with_session(Identity::new("coach-1", None)));
//! let engine = SyncEngine::new(store, &AppConfig::default());
//!
//! engine.load_all().await?;
//! engine
//!     .sync_one(AttendanceUpdate::mark("s1", "2024-03-05", AttendanceStatus::Present))
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod error;
pub mod guard;
pub mod plan;
pub mod recent;

pub use error::{SyncError, SyncScope};
pub use guard::{InFlight, InFlightGuard};
pub use plan::{RemoteEffect, SyncPlan};
pub use recent::RecentWrites;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::client::cache::AttendanceCache;
use crate::client::drafts::DraftOverlay;
use crate::client::remote::{
    Direction, Filter, Identity, Query, RemoteError, RemoteStore, Table, ATTENDANCE_CONFLICT_TARGET,
};
use crate::shared::config::AppConfig;
use crate::shared::date::format_day;
use crate::shared::{AttendanceRecord, AttendanceRow, AttendanceUpdate, CellKey, CellValue, SharedError};

/// Result of a sync call that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing to do (empty batch); no remote call was made
    Skipped,
    Committed(SyncSummary),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub op_id: Uuid,
    pub upserted: usize,
    pub deleted: usize,
}

impl SyncOutcome {
    pub fn summary(&self) -> Option<&SyncSummary> {
        match self {
            Self::Skipped => None,
            Self::Committed(summary) => Some(summary),
        }
    }
}

/// Owns the cache and the draft overlay; the only writer of either.
pub struct SyncEngine {
    store: Arc<dyn RemoteStore>,
    cache: RwLock<AttendanceCache>,
    drafts: RwLock<DraftOverlay>,
    in_flight: InFlight,
    /// Last identity the store confirmed
    identity: RwLock<Option<Identity>>,
    recent: Mutex<RecentWrites>,
    row_limit: usize,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn RemoteStore>, config: &AppConfig) -> Self {
        Self {
            store,
            cache: RwLock::new(AttendanceCache::new()),
            drafts: RwLock::new(DraftOverlay::new()),
            in_flight: InFlight::new(),
            identity: RwLock::new(None),
            recent: Mutex::new(RecentWrites::new(config.merge_window)),
            row_limit: config.attendance_row_limit,
        }
    }

    pub fn store(&self) -> &Arc<dyn RemoteStore> {
        &self.store
    }

    fn lock_recent(&self) -> MutexGuard<'_, RecentWrites> {
        self.recent.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ===== Identity =====

    /// Current session identity, falling back to the last one seen.
    pub async fn resolve_identity(&self) -> Result<Identity, SyncError> {
        match self.store.get_session().await {
            Ok(Some(identity)) => {
                *self.identity.write().await = Some(identity.clone());
                return Ok(identity);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("[SYNC] session lookup failed, using cached identity: {}", e);
            }
        }
        self.identity.read().await.clone().ok_or(SyncError::Unauthenticated)
    }

    /// Seed or clear the fallback identity (sign-in / sign-out).
    pub async fn set_cached_identity(&self, identity: Option<Identity>) {
        *self.identity.write().await = identity;
    }

    // ===== Reads =====

    /// Replace the cache with the store's attendance table.
    ///
    /// Refused with `Busy` while any write is in flight, so a reload can never
    /// overwrite an optimistic value that has not been confirmed yet.
    pub async fn load_all(&self) -> Result<Vec<AttendanceRecord>, SyncError> {
        let _guard = self.in_flight.lock_all()?;
        self.fetch_and_replace().await
    }

    async fn fetch_and_replace(&self) -> Result<Vec<AttendanceRecord>, SyncError> {
        // Newest first so that truncation drops the oldest rows
        let query = Query::new()
            .order_by("attendance_date", Direction::Descending)
            .limit(self.row_limit);
        let rows = self
            .store
            .select(Table::Attendance, &query)
            .await
            .map_err(SyncError::LoadFailure)?;

        if rows.len() >= self.row_limit {
            tracing::warn!(
                "[CACHE] attendance load hit the row limit of {}; older records are missing",
                self.row_limit
            );
        }

        let records = decode_records(rows);
        let records = self.lock_recent().merge_into(records, Instant::now());
        self.cache.write().await.replace_all(records.clone());
        tracing::info!("[CACHE] loaded {} attendance records", records.len());
        Ok(records)
    }

    pub async fn lookup(&self, key: &CellKey) -> Option<AttendanceRecord> {
        self.cache.read().await.lookup(key).cloned()
    }

    /// Draft if present, else cached value, else unmarked.
    pub async fn effective_value(&self, key: &CellKey) -> Option<CellValue> {
        let cache = self.cache.read().await;
        self.drafts.read().await.effective_value(key, &cache)
    }

    /// Run `f` against a consistent view of cache and drafts.
    pub async fn read<R>(&self, f: impl FnOnce(&AttendanceCache, &DraftOverlay) -> R) -> R {
        let cache = self.cache.read().await;
        let drafts = self.drafts.read().await;
        f(&cache, &drafts)
    }

    pub fn is_cell_busy(&self, key: &CellKey) -> bool {
        self.in_flight.is_cell_locked(key)
    }

    pub fn is_batch_in_flight(&self) -> bool {
        self.in_flight.is_batch_in_flight()
    }

    /// `Busy` if the cell or the whole grid is locked right now.
    pub fn ensure_idle(&self, key: &CellKey) -> Result<(), SyncError> {
        self.in_flight.check_cell(key)
    }

    // ===== Drafts =====

    pub async fn set_draft(&self, update: AttendanceUpdate) -> Result<(), SyncError> {
        let (key, value) = update.validate()?;
        self.in_flight.check_cell(&key)?;
        self.drafts.write().await.set_draft(key, value);
        Ok(())
    }

    pub async fn discard_draft(&self, key: &CellKey) -> bool {
        self.drafts.write().await.discard(key)
    }

    pub async fn is_dirty(&self, key: &CellKey) -> bool {
        self.drafts.read().await.is_dirty(key)
    }

    pub async fn pending_count(&self) -> usize {
        self.drafts.read().await.pending_count()
    }

    pub async fn clear_drafts(&self) {
        self.drafts.write().await.clear();
    }

    /// Send every pending draft as one batch.
    ///
    /// On success the committed drafts are dropped, except any that were
    /// replaced between reading the overlay and taking the batch lock.
    /// On failure all drafts stay.
    pub async fn commit_drafts(&self) -> Result<SyncOutcome, SyncError> {
        let updates = self.drafts.read().await.to_updates();
        let outcome = self.sync_batch(&updates).await?;

        let mut drafts = self.drafts.write().await;
        for update in &updates {
            if let Ok((key, value)) = update.validate() {
                if drafts.draft(&key) == Some(&value) {
                    drafts.discard(&key);
                }
            }
        }
        Ok(outcome)
    }

    // ===== Writes =====

    /// Optimistically set or clear one cell and persist it.
    pub async fn sync_one(&self, update: AttendanceUpdate) -> Result<SyncOutcome, SyncError> {
        let (key, value) = update.validate()?;
        let _guard = self.in_flight.lock_cell(&key)?;
        let identity = self.resolve_identity().await?;

        let plan = plan::plan_single(key, value, &identity.user_id);
        self.run(SyncScope::Cell, plan).await
    }

    /// Optimistically apply many updates and persist them together.
    pub async fn sync_batch(&self, updates: &[AttendanceUpdate]) -> Result<SyncOutcome, SyncError> {
        if updates.is_empty() {
            return Ok(SyncOutcome::Skipped);
        }
        let cells = plan::resolve(updates)?;
        let keys: Vec<CellKey> = cells.iter().map(|(key, _)| key.clone()).collect();
        let _guard = self.in_flight.lock_batch(&keys)?;
        let identity = self.resolve_identity().await?;

        let plan = plan::plan_batch(cells, &identity.user_id);
        self.run(SyncScope::Batch, plan).await
    }

    async fn run(&self, scope: SyncScope, plan: SyncPlan) -> Result<SyncOutcome, SyncError> {
        let op_id = Uuid::new_v4();

        let snapshot = {
            let mut cache = self.cache.write().await;
            let snapshot = cache.capture(plan.keys());
            cache.apply(&plan.changes);
            snapshot
        };
        tracing::debug!(
            "[SYNC] {} applied {} cells locally ({:?}), {} remote calls",
            op_id,
            plan.changes.len(),
            scope,
            plan.effects.len()
        );

        if let Err(source) = self.execute(&plan.effects).await {
            tracing::error!("[SYNC] {} remote write failed: {}", op_id, source);
            self.cache.write().await.restore_cells(snapshot);
            tracing::warn!("[SYNC] {} rolled back {} cells", op_id, plan.changes.len());
            return Err(SyncError::RemoteWriteFailure { scope, source });
        }

        // The optimistic values stay authoritative; refreshing is left to
        // an explicit load_all.
        self.lock_recent().record(&plan.changes, Instant::now());

        let summary = SyncSummary {
            op_id,
            upserted: plan.upserted(),
            deleted: plan.deleted(),
        };
        tracing::info!(
            "[SYNC] {} committed: {} upserted, {} cleared",
            op_id,
            summary.upserted,
            summary.deleted
        );
        Ok(SyncOutcome::Committed(summary))
    }

    async fn execute(&self, effects: &[RemoteEffect]) -> Result<(), RemoteError> {
        for effect in effects {
            match effect {
                RemoteEffect::Delete { key } => {
                    let filters = [
                        Filter::eq("student_id", key.student_id.as_str()),
                        Filter::eq("attendance_date", format_day(key.date)),
                    ];
                    self.store.delete(Table::Attendance, &filters).await?;
                }
                RemoteEffect::DeleteIn { date, student_ids } => {
                    let filters = [
                        Filter::eq("attendance_date", format_day(*date)),
                        Filter::is_in("student_id", student_ids.iter().map(|id| id.as_str())),
                    ];
                    self.store.delete(Table::Attendance, &filters).await?;
                }
                RemoteEffect::Upsert { rows } => {
                    let rows = encode_rows(rows)?;
                    self.store
                        .upsert(Table::Attendance, rows, &ATTENDANCE_CONFLICT_TARGET)
                        .await?;
                }
            }
        }
        Ok(())
    }
}

fn encode_rows(rows: &[AttendanceRow]) -> Result<Vec<Value>, RemoteError> {
    rows.iter()
        .map(|row| serde_json::to_value(row).map_err(|e| RemoteError::decode(format!("failed to encode row: {}", e))))
        .collect()
}

/// Decode loaded rows, skipping any that are malformed.
fn decode_records(rows: Vec<Value>) -> Vec<AttendanceRecord> {
    let total = rows.len();
    let records: Vec<AttendanceRecord> = rows
        .into_iter()
        .filter_map(|row| {
            let decoded = serde_json::from_value::<AttendanceRow>(row.clone())
                .map_err(SharedError::from)
                .and_then(AttendanceRecord::from_row);
            match decoded {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("[CACHE] skipping attendance row {}: {}", row, e);
                    None
                }
            }
        })
        .collect();
    if records.len() < total {
        tracing::warn!("[CACHE] skipped {} of {} attendance rows", total - records.len(), total);
    }
    records
}
