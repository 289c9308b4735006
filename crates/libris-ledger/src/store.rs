use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::{Connection, OpenFlags, Row};
use tracing::{debug, instrument};

use crate::error::{LedgerError, Result};
use crate::types::{format_ledger_date, DueLoan, LoanRecord, StudentContact};

/// Read interface over the lending ledger.
///
/// Calls are blocking; async callers run them on a blocking thread.
pub trait LoanLedger: Send + Sync {
    /// Loans whose due date is exactly `date`.
    fn due_on(&self, date: NaiveDate) -> Result<Vec<DueLoan>>;

    /// Loans whose due date is strictly before `date`.
    fn due_before(&self, date: NaiveDate) -> Result<Vec<DueLoan>>;
}

const DUE_LOANS_SELECT: &str = "SELECT i.stdid, l.name, l.email, b.title,
            CAST(i.book_id AS TEXT), CAST(i.issue AS TEXT), CAST(i.exp AS TEXT)
     FROM BookIssue i
     JOIN Login l ON l.userid = i.stdid
     JOIN Book b ON b.serial = i.serial";

/// SQLite-backed ledger. Each query opens its own connection and drops it
/// before returning, so no handle is ever shared between tasks.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    path: PathBuf,
}

impl SqliteLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| LedgerError::Open {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn query(&self, condition: &str, date: NaiveDate) -> Result<Vec<DueLoan>> {
        let conn = self.open()?;
        let sql = format!("{DUE_LOANS_SELECT} WHERE {condition} ORDER BY i.exp, i.rowid");
        let mut stmt = conn.prepare(&sql)?;
        let loans = stmt
            .query_map([format_ledger_date(date)], row_to_due_loan)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        debug!(count = loans.len(), "ledger query returned");
        Ok(loans)
    }
}

impl LoanLedger for SqliteLedger {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn due_on(&self, date: NaiveDate) -> Result<Vec<DueLoan>> {
        self.query("i.exp = ?1", date)
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn due_before(&self, date: NaiveDate) -> Result<Vec<DueLoan>> {
        self.query("i.exp < ?1", date)
    }
}

fn row_to_due_loan(row: &Row<'_>) -> rusqlite::Result<DueLoan> {
    let student_id: String = row.get(0)?;
    Ok(DueLoan {
        loan: LoanRecord {
            student_id: student_id.clone(),
            book_copy_id: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            book_title: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            issue_date: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            due_date: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        },
        contact: StudentContact {
            student_id,
            name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            email: row.get(2)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    fn ledger() -> (tempfile::TempDir, SqliteLedger) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("library.db");
        let conn = Connection::open(&path).unwrap();
        init_db(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO Login (name, userid, email) VALUES
                ('Amina', 'S001', 'amina@aoa.school'),
                ('Baraka', 'S002', NULL);
             INSERT INTO Book (title, serial, book_id) VALUES
                ('Things Fall Apart', 1, 'TFA-002'),
                ('The River Between', 2, 'TRB-011');
             INSERT INTO BookIssue (stdid, serial, book_id, issue, exp) VALUES
                ('S001', '1', 'TFA-002', '2025-03-01', '2025-03-06'),
                ('S002', '2', 'TRB-011', '2025-02-20', '2025-03-02');",
        )
        .unwrap();
        (dir, SqliteLedger::new(path))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn due_on_matches_exact_date() {
        let (_dir, ledger) = ledger();

        let loans = ledger.due_on(date(2025, 3, 6)).unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].contact.name, "Amina");
        assert_eq!(loans[0].email(), Some("amina@aoa.school"));
        assert_eq!(loans[0].loan.book_title, "Things Fall Apart");
        assert_eq!(loans[0].loan.book_copy_id, "TFA-002");

        assert!(ledger.due_on(date(2025, 3, 7)).unwrap().is_empty());
    }

    #[test]
    fn due_before_is_strict() {
        let (_dir, ledger) = ledger();

        assert!(ledger.due_before(date(2025, 3, 2)).unwrap().is_empty());

        let loans = ledger.due_before(date(2025, 3, 3)).unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].contact.student_id, "S002");
        assert_eq!(loans[0].email(), None);

        assert_eq!(ledger.due_before(date(2025, 4, 1)).unwrap().len(), 2);
    }

    #[test]
    fn missing_database_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = SqliteLedger::new(dir.path().join("absent.db"));
        assert!(matches!(
            ledger.due_on(date(2025, 3, 6)),
            Err(LedgerError::Open { .. })
        ));
    }
}
