use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// All errors that can occur in minibrs-core.
#[derive(Debug, Error)]
pub enum MinibrsError {
    #[error("Group not found: {0}")]
    GroupNotFound(Uuid),

    #[error("Student not found: {0}")]
    StudentNotFound(Uuid),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("Field '{field}' does not exist on {entity}")]
    UnknownField { entity: &'static str, field: String },

    #[error("Timed out after {0:?} waiting for a database connection")]
    PoolTimeout(Duration),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl MinibrsError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::GroupNotFound(_) | Self::StudentNotFound(_) | Self::TaskNotFound(_)
        )
    }

    /// Caller mistakes, as opposed to storage or environment failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::InvalidId(_) | Self::UnknownField { .. }
        )
    }

    /// Short machine-readable name used in JSON error envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GroupNotFound(_) | Self::StudentNotFound(_) | Self::TaskNotFound(_) => {
                "not_found"
            }
            Self::Validation(_) | Self::UnknownField { .. } => "validation",
            Self::InvalidId(_) => "invalid_id",
            Self::PoolTimeout(_) | Self::Database(_) => "storage",
            Self::Config(_) | Self::TomlParse(_) | Self::TomlSerialize(_) => "config",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            e if e.is_not_found() => ExitCode::NotFound,
            e if e.is_client_error() => ExitCode::InvalidArgs,
            Self::Io(_) => ExitCode::FileSystemError,
            Self::Database(_) | Self::PoolTimeout(_) | Self::Json(_) => ExitCode::StorageError,
            _ => ExitCode::GeneralError,
        }
    }
}

/// Process exit codes used by the `minibrs` binary.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    NotFound = 2,
    InvalidArgs = 3,
    FileSystemError = 4,
    StorageError = 5,
}

pub type Result<T> = std::result::Result<T, MinibrsError>;
