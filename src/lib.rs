//! Rollcall - Attendance Sync Core
//!
//! Rollcall is the client-side core of an attendance-management application
//! for a sports and youth program. Students are marked per training day in a
//! student×day grid; every mark is applied locally at once and then written
//! to a hosted backend, with a rollback when the write fails.
//!
//! # Overview
//!
//! This library provides:
//! - A date normalizer producing canonical `YYYY-MM-DD` keys
//! - An in-memory attendance cache indexed by `(student, day)`
//! - A draft overlay for editing a grid before saving it in one go
//! - A sync engine with single-cell and batch paths, per-cell and grid-wide
//!   in-flight guards, and rollback of exactly the touched cells
//! - Roster loading, absence alerts and dashboard counters
//!
//! # Module Structure
//!
//! - **`shared`** - Platform-agnostic domain types
//!   - Status codes, cell keys, records, update requests
//!   - Classes and students
//!   - Date normalizer, error types, configuration
//!
//! - **`client`** - Session-side core
//!   - `RemoteStore` port, REST adapter (`reqwest`), in-memory adapter
//!   - Attendance cache, draft overlay, sync engine
//!   - Grid editing session, reports, application context
//!
//! # Feature Flags
//!
//! - **`cli`** (default) - Builds the `rollcall` binary
//!   - Adds `tracing-subscriber` and `dotenv`
//!
//! # Usage
//!
//! ```rust,no_run
//! use rollcall::client::{AppContext, Config};
//! use rollcall::client::grid::Schedule;
//! use rollcall::shared::AttendanceStatus;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let context = AppContext::connect(Config::load()?)?;
//! context.refresh().await?;
//!
//! let grid = context.grid(Schedule::Projeto, 2024, 3).await?;
//! let day = chrono::NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
//! grid.mark_all(day, AttendanceStatus::Present).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Consistency
//!
//! - The cache is only ever written by the sync engine, in single steps with
//!   no suspension point in between, so readers never see half an operation.
//! - A failed remote write restores the touched cells exactly.
//! - After a successful batch the optimistic state is kept; a reload within
//!   the merge window keeps the confirmed values over stale rows.
//!
//! # Error Handling
//!
//! - `shared::SharedError` for validation and serialization
//! - `client::remote::RemoteError` for store failures
//! - `client::sync::SyncError` for engine results, with `user_message()` for display
//! - `shared::ConfigError` for configuration

/// Shared types and data structures
pub mod shared;

/// Client-side sync core
pub mod client;
