//! tradelens: scheduled analytics over a closed-trade ledger.
//!
//! Hexagonal architecture: calculators and the run coordinator live in
//! [`domain`], port traits in [`ports`], SQLite, config, logging and the
//! tokio scheduler in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
