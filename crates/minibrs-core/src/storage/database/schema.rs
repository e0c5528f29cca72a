use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: u32 = 2;

pub fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
        ",
    )?;
    Ok(())
}

pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS groups (
            id            TEXT(36) PRIMARY KEY,
            name          TEXT NOT NULL,
            course_number INTEGER NOT NULL,
            created_at    TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS students (
            id         TEXT(36) PRIMARY KEY,
            name       TEXT NOT NULL,
            group_id   TEXT(36) NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS tasks (
            id         TEXT(36) PRIMARY KEY,
            student_id TEXT(36) NOT NULL REFERENCES students(id) ON DELETE CASCADE,
            number     INTEGER NOT NULL,
            status     TEXT NOT NULL DEFAULT 'NOT_SUBMITTED'
                       CHECK (status IN ('SUBMITTED', 'NOT_SUBMITTED')),
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (student_id, number)
        );
        ",
    )?;
    Ok(())
}

pub fn create_indexes(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_groups_name        ON groups(name);
        CREATE INDEX IF NOT EXISTS idx_groups_course      ON groups(course_number);
        CREATE INDEX IF NOT EXISTS idx_students_group_id  ON students(group_id);
        CREATE INDEX IF NOT EXISTS idx_students_name      ON students(name);
        CREATE INDEX IF NOT EXISTS idx_tasks_status       ON tasks(status);
        ",
    )?;
    Ok(())
}
