//! Shared types and models for the parts ledger
//!
//! This crate contains the domain types used by the backend services and
//! by any client that talks to the ledger API. It performs no I/O.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
