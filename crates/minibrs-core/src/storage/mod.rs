pub mod backend;
pub mod database;
pub mod json_store;
pub mod repositories;

pub use backend::{JsonStorage, SqliteStorage, Storage, open_storage};
pub use database::{ConnectionPool, open_database, open_in_memory};
pub use json_store::{JsonRepository, Params};
