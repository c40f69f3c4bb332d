//! Test suite for Rollcall
//!
//! This module organizes all tests

pub mod common;
pub mod integration;
pub mod property;
