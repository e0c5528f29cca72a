use std::sync::Arc;

use rusqlite::types::Type;
use rusqlite::{Row, params};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Task, TaskStatus};
use crate::storage::database::ConnectionPool;

use super::{Repository, optional, uuid_column};

pub trait TaskRepository: Repository<Entity = Task, Id = Uuid> + Send + Sync {
    fn list(&self) -> Result<Vec<Task>>;
    /// Tasks of one student ordered by number.
    fn list_by_student(&self, student_id: &Uuid) -> Result<Vec<Task>>;
    fn list_by_status(&self, status: TaskStatus) -> Result<Vec<Task>>;
    fn find_by_student_and_number(&self, student_id: &Uuid, number: u32) -> Result<Option<Task>>;
    /// Returns false when no task has this id.
    fn update_status(&self, id: &Uuid, status: TaskStatus) -> Result<bool>;
    fn delete_by_student(&self, student_id: &Uuid) -> Result<usize>;
    fn count(&self) -> Result<usize>;
    fn count_by_status(&self, status: TaskStatus) -> Result<usize>;
    fn count_by_student_and_status(&self, student_id: &Uuid, status: TaskStatus) -> Result<usize>;
}

const SELECT_TASK: &str = "SELECT id, student_id, number, status FROM tasks";

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let status: String = row.get(3)?;
    Ok(Task {
        id: uuid_column(row, 0)?,
        student_id: uuid_column(row, 1)?,
        number: row.get(2)?,
        status: status
            .parse()
            .map_err(|e: String| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into()))?,
    })
}

pub struct SqliteTaskRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteTaskRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn query(&self, filter: &str, args: impl rusqlite::Params) -> Result<Vec<Task>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!("{SELECT_TASK} {filter} ORDER BY number, id"))?;
        let tasks = stmt
            .query_map(args, task_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    fn count_where(&self, filter: &str, args: impl rusqlite::Params) -> Result<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM tasks {filter}"),
            args,
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl Repository for SqliteTaskRepository {
    type Entity = Task;
    type Id = Uuid;

    fn find_by_id(&self, id: &Uuid) -> Result<Option<Task>> {
        let conn = self.pool.get()?;
        optional(conn.query_row(
            &format!("{SELECT_TASK} WHERE id = ?1"),
            params![id.to_string()],
            task_from_row,
        ))
    }

    fn save(&self, task: &Task) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO tasks (id, student_id, number, status) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                student_id = excluded.student_id,
                number = excluded.number,
                status = excluded.status,
                updated_at = CURRENT_TIMESTAMP",
            params![
                task.id.to_string(),
                task.student_id.to_string(),
                task.number,
                task.status.as_str()
            ],
        )?;
        Ok(())
    }

    fn delete(&self, id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    fn exists(&self, id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        Ok(conn
            .prepare("SELECT 1 FROM tasks WHERE id = ?1")?
            .exists(params![id.to_string()])?)
    }
}

impl TaskRepository for SqliteTaskRepository {
    fn list(&self) -> Result<Vec<Task>> {
        self.query("", [])
    }

    fn list_by_student(&self, student_id: &Uuid) -> Result<Vec<Task>> {
        self.query("WHERE student_id = ?1", params![student_id.to_string()])
    }

    fn list_by_status(&self, status: TaskStatus) -> Result<Vec<Task>> {
        self.query("WHERE status = ?1", params![status.as_str()])
    }

    fn find_by_student_and_number(&self, student_id: &Uuid, number: u32) -> Result<Option<Task>> {
        let conn = self.pool.get()?;
        optional(conn.query_row(
            &format!("{SELECT_TASK} WHERE student_id = ?1 AND number = ?2"),
            params![student_id.to_string(), number],
            task_from_row,
        ))
    }

    fn update_status(&self, id: &Uuid, status: TaskStatus) -> Result<bool> {
        let conn = self.pool.get()?;
        let updated = conn.execute(
            "UPDATE tasks SET status = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![status.as_str(), id.to_string()],
        )?;
        Ok(updated > 0)
    }

    fn delete_by_student(&self, student_id: &Uuid) -> Result<usize> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM tasks WHERE student_id = ?1",
            params![student_id.to_string()],
        )?;
        Ok(deleted)
    }

    fn count(&self) -> Result<usize> {
        self.count_where("", [])
    }

    fn count_by_status(&self, status: TaskStatus) -> Result<usize> {
        self.count_where("WHERE status = ?1", params![status.as_str()])
    }

    fn count_by_student_and_status(&self, student_id: &Uuid, status: TaskStatus) -> Result<usize> {
        self.count_where(
            "WHERE student_id = ?1 AND status = ?2",
            params![student_id.to_string(), status.as_str()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repositories::test_support::{pool, seed_student};

    fn seeded() -> (SqliteTaskRepository, Uuid) {
        let pool = pool();
        let (_, student) = seed_student(&pool);
        let repo = SqliteTaskRepository::new(pool);
        for n in [3, 1, 2] {
            repo.save(&Task::new(student.id, n)).unwrap();
        }
        (repo, student.id)
    }

    #[test]
    fn test_list_by_student_ordered_by_number() {
        let (repo, student_id) = seeded();
        let numbers: Vec<_> = repo
            .list_by_student(&student_id)
            .unwrap()
            .into_iter()
            .map(|t| t.number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(repo.count().unwrap(), 3);
    }

    #[test]
    fn test_update_status_and_counts() {
        let (repo, student_id) = seeded();
        let task = repo.find_by_student_and_number(&student_id, 2).unwrap().unwrap();

        assert!(repo.update_status(&task.id, TaskStatus::Submitted).unwrap());
        assert!(!repo.update_status(&Uuid::new_v4(), TaskStatus::Submitted).unwrap());

        assert_eq!(repo.count_by_status(TaskStatus::Submitted).unwrap(), 1);
        assert_eq!(
            repo.count_by_student_and_status(&student_id, TaskStatus::NotSubmitted)
                .unwrap(),
            2
        );
        let submitted = repo.list_by_status(TaskStatus::Submitted).unwrap();
        assert_eq!(submitted, vec![task]);
        assert!(submitted[0].is_submitted());
    }

    #[test]
    fn test_duplicate_number_rejected() {
        let (repo, student_id) = seeded();
        assert!(repo.save(&Task::new(student_id, 1)).is_err());
    }

    #[test]
    fn test_delete_by_student() {
        let (repo, student_id) = seeded();
        assert_eq!(repo.delete_by_student(&student_id).unwrap(), 3);
        assert_eq!(repo.delete_by_student(&student_id).unwrap(), 0);
        assert!(repo.find_by_student_and_number(&student_id, 1).unwrap().is_none());
    }
}
