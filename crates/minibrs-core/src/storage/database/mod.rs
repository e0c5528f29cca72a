mod connection;
mod migrations;
mod schema;

pub use connection::{ConnectionPool, PoolStatus, PooledConnection};
pub use migrations::{Migration, get_applied_versions, run_migrations};
pub use schema::SCHEMA_VERSION;

use std::path::Path;

use crate::config::PoolConfig;
use crate::error::Result;

/// Open (creating if needed) the database at `path` and bring its schema up to date.
pub fn open_database(path: &Path, config: &PoolConfig) -> Result<ConnectionPool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = ConnectionPool::open(path, config)?;
    {
        let conn = pool.get()?;
        run_migrations(&conn)?;
    }
    tracing::info!(path = %path.display(), "database ready");
    Ok(pool)
}

pub fn open_in_memory() -> Result<ConnectionPool> {
    let pool = ConnectionPool::open_in_memory()?;
    {
        let conn = pool.get()?;
        run_migrations(&conn)?;
    }
    Ok(pool)
}
