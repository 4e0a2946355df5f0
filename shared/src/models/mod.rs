//! Domain models for the Stock Manager platform

mod exit_request;
mod inventory;
mod movement;
mod order;
mod product;
mod reference;
mod user;

pub use exit_request::*;
pub use inventory::*;
pub use movement::*;
pub use order::*;
pub use product::*;
pub use reference::*;
pub use user::*;
