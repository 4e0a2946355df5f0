//! Shared types and workflow logic for the Stock Manager platform
//!
//! This crate contains the domain model and every pure computation shared
//! between the backend, the browser (via WASM), and the tests.

pub mod alerts;
pub mod basket;
pub mod error;
pub mod ledger;
pub mod models;
pub mod statistics;
pub mod store;
pub mod types;
pub mod validation;

pub use alerts::*;
pub use basket::*;
pub use error::*;
pub use ledger::*;
pub use models::*;
pub use statistics::*;
pub use types::*;
pub use validation::*;
