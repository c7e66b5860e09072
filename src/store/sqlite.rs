use std::time::Duration;

use rusqlite::{Connection, OpenFlags, Result};

use crate::constants;

/// Opens (or creates) the database file and applies the connection-level
/// settings every pipeline run relies on.
pub fn init_connection(sqlite_file: &str) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        sqlite_file,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_row| Ok(()))?;
    conn.busy_timeout(Duration::from_secs(constants::DB_BUSY_TIMEOUT_SECS))?;
    Ok(conn)
}
