use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::{AppConfig, Backend};
use crate::error::Result;
use crate::models::{Group, Student, Task};

use super::database::{ConnectionPool, open_database};
use super::json_store::JsonRepository;
use super::repositories::{
    GroupRepository, SqliteGroupRepository, SqliteStudentRepository, SqliteTaskRepository,
    StudentRepository, TaskRepository,
};

/// The three repositories of one storage backend.
pub trait Storage: Send + Sync {
    fn groups(&self) -> &dyn GroupRepository;
    fn students(&self) -> &dyn StudentRepository;
    fn tasks(&self) -> &dyn TaskRepository;
    /// One-line description for `doctor` and startup logs.
    fn describe(&self) -> String;
    /// Serialises multi-step writes: checks and the writes they guard happen
    /// under one guard, so cascades never interleave.
    fn write_lock(&self) -> MutexGuard<'_, ()>;
}

fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct SqliteStorage {
    pool: Arc<ConnectionPool>,
    groups: SqliteGroupRepository,
    students: SqliteStudentRepository,
    tasks: SqliteTaskRepository,
    writes: Mutex<()>,
}

impl SqliteStorage {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self {
            groups: SqliteGroupRepository::new(Arc::clone(&pool)),
            students: SqliteStudentRepository::new(Arc::clone(&pool)),
            tasks: SqliteTaskRepository::new(Arc::clone(&pool)),
            pool,
            writes: Mutex::new(()),
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

impl Storage for SqliteStorage {
    fn groups(&self) -> &dyn GroupRepository {
        &self.groups
    }

    fn students(&self) -> &dyn StudentRepository {
        &self.students
    }

    fn tasks(&self) -> &dyn TaskRepository {
        &self.tasks
    }

    fn describe(&self) -> String {
        let status = self.pool.status();
        let location = match self.pool.path() {
            Some(path) => path.display().to_string(),
            None => ":memory:".to_string(),
        };
        format!(
            "sqlite {location} (pool {}/{} open, {} idle)",
            status.total, status.max_size, status.idle
        )
    }

    fn write_lock(&self) -> MutexGuard<'_, ()> {
        acquire(&self.writes)
    }
}

pub struct JsonStorage {
    dir: PathBuf,
    groups: JsonRepository<Group>,
    students: JsonRepository<Student>,
    tasks: JsonRepository<Task>,
    writes: Mutex<()>,
}

impl JsonStorage {
    /// Open `groups.json`, `students.json` and `tasks.json` under `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            groups: JsonRepository::open(dir.join("groups.json"))?,
            students: JsonRepository::open(dir.join("students.json"))?,
            tasks: JsonRepository::open(dir.join("tasks.json"))?,
            writes: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Storage for JsonStorage {
    fn groups(&self) -> &dyn GroupRepository {
        &self.groups
    }

    fn students(&self) -> &dyn StudentRepository {
        &self.students
    }

    fn tasks(&self) -> &dyn TaskRepository {
        &self.tasks
    }

    fn describe(&self) -> String {
        format!("json {}", self.dir.display())
    }

    fn write_lock(&self) -> MutexGuard<'_, ()> {
        acquire(&self.writes)
    }
}

/// Open the backend selected by `database.backend`.
pub fn open_storage(config: &AppConfig) -> Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match config.database.backend {
        Backend::Sqlite => {
            let pool = open_database(&config.database_path(), &config.database.pool)?;
            Arc::new(SqliteStorage::new(Arc::new(pool)))
        }
        Backend::Json => Arc::new(JsonStorage::open(&config.json_dir())?),
    };
    tracing::info!(storage = %storage.describe(), "storage opened");
    Ok(storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::open_in_memory;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir, backend: Backend) -> AppConfig {
        let mut config = AppConfig::default();
        config.core.data_dir = dir.path().to_string_lossy().to_string();
        config.database.backend = backend;
        config
    }

    #[test]
    fn test_open_sqlite_storage() {
        let dir = TempDir::new().unwrap();
        let storage = open_storage(&config_in(&dir, Backend::Sqlite)).unwrap();
        assert!(storage.describe().starts_with("sqlite "));
        assert!(dir.path().join("minibrs.db").exists());
    }

    #[test]
    fn test_open_json_storage() {
        let dir = TempDir::new().unwrap();
        let storage = open_storage(&config_in(&dir, Backend::Json)).unwrap();
        storage.groups().save(&Group::new("IT-11", 1)).unwrap();

        assert!(storage.describe().starts_with("json "));
        assert!(dir.path().join("json").join("groups.json").exists());
    }

    #[test]
    fn test_in_memory_description() {
        let storage = SqliteStorage::new(Arc::new(open_in_memory().unwrap()));
        assert!(storage.describe().contains(":memory:"));
        assert_eq!(storage.pool().status().max_size, 1);
    }
}
