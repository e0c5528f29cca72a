pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod storage;

pub use config::{AppConfig, Backend};
pub use error::{ExitCode, MinibrsError, Result};
pub use models::*;

pub use service::{GroupService, Services, StudentService, TaskService};
pub use storage::{
    ConnectionPool, JsonRepository, JsonStorage, Params, SqliteStorage, Storage, open_database,
    open_in_memory, open_storage,
};

pub use storage::repositories::{
    GroupRepository, Repository, SqliteGroupRepository, SqliteStudentRepository,
    SqliteTaskRepository, StudentRepository, TaskRepository,
};
