use rusqlite::Connection;

use estad_core::EstadError;

pub fn init_db(conn: &Connection) -> Result<(), EstadError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| EstadError::Database(e.to_string()))?;

    Ok(())
}
