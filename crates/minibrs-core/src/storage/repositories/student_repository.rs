use std::sync::Arc;

use rusqlite::{Row, params};
use uuid::Uuid;

use crate::error::Result;
use crate::models::Student;
use crate::storage::database::ConnectionPool;

use super::{Repository, optional, uuid_column};

pub trait StudentRepository: Repository<Entity = Student, Id = Uuid> + Send + Sync {
    fn list(&self) -> Result<Vec<Student>>;
    fn list_by_group(&self, group_id: &Uuid) -> Result<Vec<Student>>;
    fn find_by_name(&self, name: &str) -> Result<Vec<Student>>;
    fn count_by_group(&self, group_id: &Uuid) -> Result<usize>;
    fn exists_by_name_and_group(&self, name: &str, group_id: &Uuid) -> Result<bool>;
}

const SELECT_STUDENT: &str = "SELECT id, name, group_id FROM students";

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        group_id: uuid_column(row, 2)?,
    })
}

pub struct SqliteStudentRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteStudentRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn query(&self, filter: &str, args: impl rusqlite::Params) -> Result<Vec<Student>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!("{SELECT_STUDENT} {filter} ORDER BY name, id"))?;
        let students = stmt
            .query_map(args, student_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(students)
    }
}

impl Repository for SqliteStudentRepository {
    type Entity = Student;
    type Id = Uuid;

    fn find_by_id(&self, id: &Uuid) -> Result<Option<Student>> {
        let conn = self.pool.get()?;
        optional(conn.query_row(
            &format!("{SELECT_STUDENT} WHERE id = ?1"),
            params![id.to_string()],
            student_from_row,
        ))
    }

    fn save(&self, student: &Student) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO students (id, name, group_id) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                group_id = excluded.group_id",
            params![
                student.id.to_string(),
                student.name,
                student.group_id.to_string()
            ],
        )?;
        Ok(())
    }

    fn delete(&self, id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        let deleted = conn.execute("DELETE FROM students WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    fn exists(&self, id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        Ok(conn
            .prepare("SELECT 1 FROM students WHERE id = ?1")?
            .exists(params![id.to_string()])?)
    }
}

impl StudentRepository for SqliteStudentRepository {
    fn list(&self) -> Result<Vec<Student>> {
        self.query("", [])
    }

    fn list_by_group(&self, group_id: &Uuid) -> Result<Vec<Student>> {
        self.query("WHERE group_id = ?1", params![group_id.to_string()])
    }

    fn find_by_name(&self, name: &str) -> Result<Vec<Student>> {
        self.query("WHERE name = ?1", params![name])
    }

    fn count_by_group(&self, group_id: &Uuid) -> Result<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM students WHERE group_id = ?1",
            params![group_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn exists_by_name_and_group(&self, name: &str, group_id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        Ok(conn
            .prepare("SELECT 1 FROM students WHERE name = ?1 AND group_id = ?2")?
            .exists(params![name, group_id.to_string()])?)
    }
}
