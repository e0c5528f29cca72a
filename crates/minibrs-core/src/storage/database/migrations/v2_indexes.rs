use rusqlite::Connection;

use super::Migration;
use crate::error::Result;
use crate::storage::database::schema;

pub struct V2Indexes;

impl Migration for V2Indexes {
    fn version(&self) -> u32 {
        2
    }

    fn description(&self) -> &'static str {
        "Lookup indexes on names, course numbers, foreign keys and task status"
    }

    fn up(&self, conn: &Connection) -> Result<()> {
        schema::create_indexes(conn)
    }
}
