//! Shared types and models for the Agrione inventory ledger
//!
//! This crate contains the pure domain of the stock ledger: entity models,
//! workflow state rules, FIFO allocation and list filters. It performs no I/O
//! so the backend and its tests can reason about ledger decisions directly.

pub mod allocation;
pub mod filters;
pub mod models;
pub mod types;
pub mod validation;

pub use allocation::*;
pub use filters::*;
pub use models::*;
pub use types::*;
pub use validation::*;
