//! External service integrations

pub mod photo_storage;

pub use photo_storage::PhotoStorageClient;
