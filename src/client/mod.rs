//! Client Module
//!
//! The session-side core of the attendance system: the remote-store port, the
//! local cache and draft overlay, the sync engine that keeps them consistent
//! with the hosted store, and the grid and report layers built on top.
//!
//! # Architecture
//!
//! - **`config`** - Configuration resolution (file, environment, access token)
//! - **`remote`** - `RemoteStore` port with the REST and in-memory adapters
//! - **`cache`** - In-memory mirror of the attendance table
//! - **`drafts`** - Pending edits shadowing the cache
//! - **`sync`** - Optimistic single-cell and batch sync with rollback
//! - **`grid`** - Month sheet editing: status cycle, justification, mark-all
//! - **`reports`** - Absence alerts and dashboard counters
//! - **`state`** - Roster loading and the application context
//! - **`main`** - Command-line entry point (binary, `cli` feature)
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── mod.rs      - Module exports and documentation
//! ├── main.rs     - Command-line entry point
//! ├── config.rs   - Configuration management
//! ├── remote/     - Store port, REST and memory adapters
//! ├── cache.rs    - Attendance cache
//! ├── drafts.rs   - Draft overlay
//! ├── sync/       - Sync engine, planning, in-flight guards
//! ├── grid.rs     - Grid editing session
//! ├── reports.rs  - Absence reports
//! └── state.rs    - Roster and application context
//! ```

pub mod cache;
pub mod config;
pub mod drafts;
pub mod grid;
pub mod remote;
pub mod reports;
pub mod state;
pub mod sync;

// Re-export commonly used types
pub use cache::AttendanceCache;
pub use config::Config;
pub use drafts::DraftOverlay;
pub use grid::{AttendanceGrid, EditMode, Schedule, ToggleOutcome};
pub use remote::{MemoryStore, RemoteError, RemoteStore, RestStore};
pub use state::{AppContext, Roster};
pub use sync::{SyncEngine, SyncError, SyncOutcome};
