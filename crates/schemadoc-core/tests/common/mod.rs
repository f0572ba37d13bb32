//! Common test utilities for integration tests.
//!
//! This module provides schema fixtures and graph validation utilities
//! shared across integration test files.

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod graph_validator;

// Re-export commonly used items
pub use fixtures::{
    hr_connection, oracle_snapshot, write_hr_database, HR_SCHEMA, HR_SCHEMA_WITHOUT_SEQUENCES,
};
pub use graph_validator::{assert_valid, validate_graph};
