//! Concrete adapter implementations for ports.

pub mod file_config_adapter;
pub mod logging;
pub mod scheduler;
pub mod sqlite_adapter;
