use std::sync::Arc;

use rusqlite::{Row, params};
use uuid::Uuid;

use crate::error::Result;
use crate::models::Group;
use crate::storage::database::ConnectionPool;

use super::{Repository, optional, uuid_column};

pub trait GroupRepository: Repository<Entity = Group, Id = Uuid> + Send + Sync {
    /// All groups ordered by name.
    fn list(&self) -> Result<Vec<Group>>;
    fn find_by_name(&self, name: &str) -> Result<Vec<Group>>;
    fn find_by_course(&self, course_number: u8) -> Result<Vec<Group>>;
}

const SELECT_GROUP: &str = "SELECT id, name, course_number FROM groups";

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        course_number: row.get(2)?,
    })
}

pub struct SqliteGroupRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteGroupRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn query(&self, filter: &str, args: impl rusqlite::Params) -> Result<Vec<Group>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!("{SELECT_GROUP} {filter} ORDER BY name, id"))?;
        let groups = stmt
            .query_map(args, group_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(groups)
    }
}

impl Repository for SqliteGroupRepository {
    type Entity = Group;
    type Id = Uuid;

    fn find_by_id(&self, id: &Uuid) -> Result<Option<Group>> {
        let conn = self.pool.get()?;
        optional(conn.query_row(
            &format!("{SELECT_GROUP} WHERE id = ?1"),
            params![id.to_string()],
            group_from_row,
        ))
    }

    fn save(&self, group: &Group) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO groups (id, name, course_number) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                course_number = excluded.course_number",
            params![group.id.to_string(), group.name, group.course_number],
        )?;
        Ok(())
    }

    fn delete(&self, id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        let deleted = conn.execute("DELETE FROM groups WHERE id = ?1", params![id.to_string()])?;
        Ok(deleted > 0)
    }

    fn exists(&self, id: &Uuid) -> Result<bool> {
        let conn = self.pool.get()?;
        Ok(conn
            .prepare("SELECT 1 FROM groups WHERE id = ?1")?
            .exists(params![id.to_string()])?)
    }
}

impl GroupRepository for SqliteGroupRepository {
    fn list(&self) -> Result<Vec<Group>> {
        self.query("", [])
    }

    fn find_by_name(&self, name: &str) -> Result<Vec<Group>> {
        self.query("WHERE name = ?1", params![name])
    }

    fn find_by_course(&self, course_number: u8) -> Result<Vec<Group>> {
        self.query("WHERE course_number = ?1", params![course_number])
    }
}
