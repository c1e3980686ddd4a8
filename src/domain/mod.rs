//! Core domain types and logic.

pub mod calculators;
pub mod checkpoint;
pub mod config_validation;
pub mod coordinator;
pub mod error;
pub mod order;
pub mod settings;
pub mod stats;
pub mod tables;
pub mod thresholds;
