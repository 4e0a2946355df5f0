//! Business logic services for the Stock Manager platform

pub mod cart;
pub mod exit_request;
pub mod ledger;
pub mod order;
pub mod pending_exit;
pub mod product;
pub mod reference;
pub mod reporting;
pub mod statistics;
pub mod user;

pub use cart::CartService;
pub use exit_request::ExitRequestService;
pub use ledger::LedgerService;
pub use order::OrderService;
pub use pending_exit::PendingExitService;
pub use product::ProductService;
pub use reference::ReferenceService;
pub use statistics::StatisticsService;
pub use user::UserService;
