//! Shared Module
//!
//! This module contains the platform-agnostic domain types of the attendance
//! system. They are used by the client core, the store adapters and the tests,
//! and carry serde derives matching the row shapes of the hosted store.
//!
//! # Overview
//!
//! - `attendance` - status codes, cell keys, records and update requests
//! - `roster` - classes and students
//! - `date` - canonical `YYYY-MM-DD` normalization
//! - `error` - validation and serialization errors
//! - `config` - file/builder configuration

/// Attendance records, statuses and cell keys
pub mod attendance;

/// Classes and students
pub mod roster;

/// Date normalizer
pub mod date;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use attendance::{
    AttendanceRecord, AttendanceRow, AttendanceStatus, AttendanceUpdate, CellKey, CellValue,
    StudentId,
};
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
pub use error::SharedError;
pub use roster::{Class, ClassRow, Student, StudentRow, StudentStatus};
