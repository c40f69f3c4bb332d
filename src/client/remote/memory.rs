//! # In-Memory Store
//!
//! A process-local [`RemoteStore`] with the same filter, ordering and upsert
//! semantics as the hosted store. Besides serving offline demos it lets tests
//! inject failures per operation, park writes behind a gate to observe
//! in-flight state, and inspect the exact sequence of calls the engine issued.
//!
//! ## Usage
//!
//! ```rust
//! use rollcall::client::remote::{Identity, MemoryStore, StoreOp, RemoteError};
//!
//! let store = MemoryStore::new().with_session(Identity::new("coach-1", None));
//! store.fail_next(StoreOp::Upsert, RemoteError::transport("connection reset"));
//! ```

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use super::{Direction, Filter, Identity, Query, RemoteError, RemoteStore, Table};
use crate::shared::AttendanceRow;

/// Operation kinds that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Session,
    Select,
    Insert,
    Update,
    Delete,
    Upsert,
}

/// A call received by the store, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    Select { table: Table, query: Query },
    Insert { table: Table, rows: Vec<Value> },
    Update { table: Table, patch: Value, filters: Vec<Filter> },
    Delete { table: Table, filters: Vec<Filter> },
    Upsert { table: Table, rows: Vec<Value>, on_conflict: Vec<String> },
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<Table, Vec<Value>>,
    session: Option<Identity>,
    fail_once: HashMap<StoreOp, VecDeque<RemoteError>>,
    fail_always: HashMap<StoreOp, RemoteError>,
    calls: Vec<RemoteCall>,
    write_gate: Option<Arc<Notify>>,
}

impl Inner {
    fn take_failure(&mut self, op: StoreOp) -> Option<RemoteError> {
        if let Some(error) = self.fail_once.get_mut(&op).and_then(VecDeque::pop_front) {
            return Some(error);
        }
        self.fail_always.get(&op).cloned()
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(self, identity: Identity) -> Self {
        self.set_session(Some(identity));
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_session(&self, identity: Option<Identity>) {
        self.lock().session = identity;
    }

    /// Append rows to a table without going through upsert checks
    pub fn seed(&self, table: Table, rows: impl IntoIterator<Item = Value>) {
        self.lock().tables.entry(table).or_default().extend(rows);
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.lock().tables.get(&table).cloned().unwrap_or_default()
    }

    /// Typed view of the attendance table; rows that do not decode are skipped
    pub fn attendance_rows(&self) -> Vec<AttendanceRow> {
        self.rows(Table::Attendance)
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect()
    }

    /// Fail the next call of `op` with `error`
    pub fn fail_next(&self, op: StoreOp, error: RemoteError) {
        self.lock().fail_once.entry(op).or_default().push_back(error);
    }

    /// Fail every call of `op` until [`MemoryStore::clear_failures`]
    pub fn fail_always(&self, op: StoreOp, error: RemoteError) {
        self.lock().fail_always.insert(op, error);
    }

    pub fn clear_failures(&self) {
        let mut inner = self.lock();
        inner.fail_once.clear();
        inner.fail_always.clear();
    }

    /// Park every write until [`MemoryStore::release_writes`]
    pub fn hold_writes(&self) {
        self.lock().write_gate = Some(Arc::new(Notify::new()));
    }

    pub fn release_writes(&self) {
        if let Some(gate) = self.lock().write_gate.take() {
            gate.notify_waiters();
            gate.notify_one();
        }
    }

    /// Let only the most recently parked write through; the gate stays shut.
    pub fn release_latest_write(&self) {
        if let Some(gate) = self.lock().write_gate.as_ref() {
            gate.notify_last();
        }
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    async fn pass_write_gate(&self) {
        let gate = self.lock().write_gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Null, Value::Null) => Ordering::Equal,
        // Nulls sort last, as in the hosted store's default ordering
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (a, b) => a.to_string().cmp(&b.to_string()),
    }
}

fn conflict_key(row: &Value, columns: &[&str]) -> Vec<Value> {
    columns
        .iter()
        .map(|column| row.get(*column).cloned().unwrap_or(Value::Null))
        .collect()
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get_session(&self) -> Result<Option<Identity>, RemoteError> {
        let mut inner = self.lock();
        if let Some(error) = inner.take_failure(StoreOp::Session) {
            return Err(error);
        }
        Ok(inner.session.clone())
    }

    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, RemoteError> {
        let mut inner = self.lock();
        inner.calls.push(RemoteCall::Select {
            table,
            query: query.clone(),
        });
        if let Some(error) = inner.take_failure(StoreOp::Select) {
            return Err(error);
        }

        let mut rows: Vec<Value> = inner
            .tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| query.filters.iter().all(|filter| filter.matches(row)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some((column, direction)) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(column).unwrap_or(&Value::Null),
                    b.get(column).unwrap_or(&Value::Null),
                );
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<(), RemoteError> {
        self.pass_write_gate().await;

        let mut inner = self.lock();
        inner.calls.push(RemoteCall::Insert {
            table,
            rows: rows.clone(),
        });
        if let Some(error) = inner.take_failure(StoreOp::Insert) {
            return Err(error);
        }

        let columns = table.key_columns();
        let stored = inner.tables.entry(table).or_default();
        let mut keys: Vec<Vec<Value>> = stored.iter().map(|row| conflict_key(row, columns)).collect();
        for row in &rows {
            let key = conflict_key(row, columns);
            if keys.contains(&key) {
                return Err(RemoteError::rejected(
                    409,
                    format!("duplicate key value violates unique constraint on {}", table.name()),
                ));
            }
            keys.push(key);
        }
        stored.extend(rows);
        Ok(())
    }

    async fn update(&self, table: Table, patch: Value, filters: &[Filter]) -> Result<(), RemoteError> {
        self.pass_write_gate().await;

        let mut inner = self.lock();
        inner.calls.push(RemoteCall::Update {
            table,
            patch: patch.clone(),
            filters: filters.to_vec(),
        });
        if let Some(error) = inner.take_failure(StoreOp::Update) {
            return Err(error);
        }
        if filters.is_empty() {
            return Err(RemoteError::rejected(400, "UPDATE requires a WHERE clause"));
        }
        let Value::Object(patch) = patch else {
            return Err(RemoteError::rejected(400, "update patch must be an object"));
        };

        if let Some(rows) = inner.tables.get_mut(&table) {
            for row in rows.iter_mut().filter(|row| filters.iter().all(|filter| filter.matches(row))) {
                if let Value::Object(current) = row {
                    for (column, value) in &patch {
                        current.insert(column.clone(), value.clone());
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), RemoteError> {
        self.pass_write_gate().await;

        let mut inner = self.lock();
        inner.calls.push(RemoteCall::Delete {
            table,
            filters: filters.to_vec(),
        });
        if let Some(error) = inner.take_failure(StoreOp::Delete) {
            return Err(error);
        }
        if filters.is_empty() {
            return Err(RemoteError::rejected(400, "DELETE requires a WHERE clause"));
        }

        if let Some(rows) = inner.tables.get_mut(&table) {
            rows.retain(|row| !filters.iter().all(|filter| filter.matches(row)));
        }
        Ok(())
    }

    async fn upsert(&self, table: Table, rows: Vec<Value>, on_conflict: &[&str]) -> Result<(), RemoteError> {
        self.pass_write_gate().await;

        let mut inner = self.lock();
        inner.calls.push(RemoteCall::Upsert {
            table,
            rows: rows.clone(),
            on_conflict: on_conflict.iter().map(|column| column.to_string()).collect(),
        });
        if let Some(error) = inner.take_failure(StoreOp::Upsert) {
            return Err(error);
        }

        let keys: Vec<Vec<Value>> = rows.iter().map(|row| conflict_key(row, on_conflict)).collect();
        for (index, key) in keys.iter().enumerate() {
            if keys[..index].contains(key) {
                return Err(RemoteError::rejected(
                    500,
                    "ON CONFLICT DO UPDATE command cannot affect row a second time",
                ));
            }
        }

        let stored = inner.tables.entry(table).or_default();
        for (row, key) in rows.into_iter().zip(keys) {
            let existing = stored
                .iter_mut()
                .find(|candidate| conflict_key(candidate, on_conflict) == key);
            match (existing, row) {
                (Some(Value::Object(current)), Value::Object(patch)) => {
                    for (column, value) in patch {
                        current.insert(column, value);
                    }
                }
                (Some(current), row) => *current = row,
                (None, row) => stored.push(row),
            }
        }
        Ok(())
    }
}
