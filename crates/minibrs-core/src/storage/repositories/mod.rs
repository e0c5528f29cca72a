mod group_repository;
mod student_repository;
mod task_repository;

pub use group_repository::{GroupRepository, SqliteGroupRepository};
pub use student_repository::{SqliteStudentRepository, StudentRepository};
pub use task_repository::{SqliteTaskRepository, TaskRepository};

use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

use crate::error::Result;

pub trait Repository {
    type Entity;
    type Id;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>>;
    /// Insert, or overwrite the row with the same id.
    fn save(&self, entity: &Self::Entity) -> Result<()>;
    fn delete(&self, id: &Self::Id) -> Result<bool>;

    fn exists(&self, id: &Self::Id) -> Result<bool> {
        Ok(self.find_by_id(id)?.is_some())
    }
}

/// Ids are stored as hyphenated TEXT.
pub(crate) fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn optional<T>(result: rusqlite::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
