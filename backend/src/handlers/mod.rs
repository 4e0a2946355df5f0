//! HTTP handlers for the Stock Manager API

pub mod cart;
pub mod exit_request;
pub mod health;
pub mod ledger;
pub mod order;
pub mod pending_exit;
pub mod product;
pub mod reference;
pub mod statistics;
pub mod user;

pub use cart::*;
pub use exit_request::*;
pub use health::*;
pub use ledger::*;
pub use order::*;
pub use pending_exit::*;
pub use product::*;
pub use reference::*;
pub use statistics::*;
pub use user::*;
