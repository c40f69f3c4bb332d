//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Seeded in-memory stores and engines
//! - Roster fixtures
//! - Custom assertion macros

pub mod assertions;
pub mod fixtures;

// Re-export commonly used utilities
pub use fixtures::*;
