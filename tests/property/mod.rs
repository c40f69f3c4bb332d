//! Property-based tests
//!
//! - `date_proptest` - date normalization
//! - `status_proptest` - status cycle
//! - `overlay_proptest` - cache, drafts and batch planning

pub mod date_proptest;
pub mod overlay_proptest;
