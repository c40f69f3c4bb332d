//! Integration tests
//!
//! - `sync_test` - sync engine against the in-memory store
//! - `grid_test` - grid sessions through the application context
//! - `rest_test` - HTTP adapter against a mock server

pub mod grid_test;
pub mod sync_test;
