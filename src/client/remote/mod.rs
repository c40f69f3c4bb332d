//! # Remote Store Port
//!
//! The hosted backend is reached through a small request/response data API:
//! select, insert, update, delete and upsert over three tables with equality
//! and in-list filters, plus session lookup. [`RemoteStore`] is that port; the sync engine
//! only ever talks to `Arc<dyn RemoteStore>`.
//!
//! ## Adapters
//!
//! - [`RestStore`]: HTTP adapter for the PostgREST-style API of the hosted store
//! - [`MemoryStore`]: in-process store with failure injection and a write gate

pub mod memory;
pub mod rest;

pub use memory::{MemoryStore, RemoteCall, StoreOp};
pub use rest::RestStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Attendance rows are unique per this column pair.
pub const ATTENDANCE_CONFLICT_TARGET: [&str; 2] = ["student_id", "attendance_date"];

/// Tables of the hosted store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Classes,
    Students,
    Attendance,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Self::Classes => "classes",
            Self::Students => "students",
            Self::Attendance => "attendance",
        }
    }

    /// Columns that identify a row
    pub fn key_columns(self) -> &'static [&'static str] {
        match self {
            Self::Classes | Self::Students => &["id"],
            Self::Attendance => &ATTENDANCE_CONFLICT_TARGET,
        }
    }
}

/// Row filter
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq(String, Value),
    /// `column IN (values)`
    In(String, Vec<Value>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    pub fn is_in<V: Into<Value>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::In(column.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn column(&self) -> &str {
        match self {
            Self::Eq(column, _) | Self::In(column, _) => column,
        }
    }

    /// Whether a JSON row satisfies the filter.
    pub fn matches(&self, row: &Value) -> bool {
        let cell = row.get(self.column()).unwrap_or(&Value::Null);
        match self {
            Self::Eq(_, value) => cell == value,
            Self::In(_, values) => values.iter().any(|value| value == cell),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Select parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Authenticated session identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "id")]
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email,
        }
    }
}

/// Failures reported by a store adapter
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network failure or timeout
    #[error("network error: {message}")]
    Transport { message: String },

    /// The store answered with an error status
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response body could not be decoded
    #[error("invalid response: {message}")]
    Decode { message: String },
}

impl RemoteError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// The store's own message, without the category prefix
    pub fn detail(&self) -> &str {
        match self {
            Self::Transport { message } | Self::Rejected { message, .. } | Self::Decode { message } => {
                message
            }
        }
    }
}

/// Request/response data API of the hosted store.
///
/// Used as `Arc<dyn RemoteStore>`. Every call is a suspension point; none of
/// them may be assumed to have partially applied on error.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Current authenticated identity, if any
    async fn get_session(&self) -> Result<Option<Identity>, RemoteError>;

    /// Select rows as JSON objects
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>, RemoteError>;

    /// Insert new rows; a key collision is rejected
    async fn insert(&self, table: Table, rows: Vec<Value>) -> Result<(), RemoteError>;

    /// Set the columns of `patch` on every row matching all filters
    async fn update(&self, table: Table, patch: Value, filters: &[Filter]) -> Result<(), RemoteError>;

    /// Delete every row matching all filters
    async fn delete(&self, table: Table, filters: &[Filter]) -> Result<(), RemoteError>;

    /// Insert rows, replacing any row whose `on_conflict` columns match
    async fn upsert(&self, table: Table, rows: Vec<Value>, on_conflict: &[&str]) -> Result<(), RemoteError>;

    /// Swap the session credential after sign-in or sign-out. Stores without
    /// credentials ignore it.
    async fn set_access_token(&self, _token: Option<String>) {}
}
