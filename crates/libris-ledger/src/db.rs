use rusqlite::Connection;

use crate::error::Result;

/// Create the three ledger tables the reminder scans read.
///
/// The library application owns this schema; this only exists so a fresh
/// database (tests, first boot) has something to query. Safe to call on every
/// startup — uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS Login (
            name    TEXT,
            userid  TEXT,
            email   TEXT
        );
        CREATE TABLE IF NOT EXISTS Book (
            title   TEXT,
            serial  INTEGER PRIMARY KEY,
            book_id TEXT
        );
        CREATE TABLE IF NOT EXISTS BookIssue (
            stdid   TEXT,
            serial  TEXT,
            book_id TEXT,
            issue   DATE,
            exp     DATE
        );
        CREATE INDEX IF NOT EXISTS idx_bookissue_exp ON BookIssue(exp);",
    )?;
    Ok(())
}
