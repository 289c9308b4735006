//! Read access to the lending ledger the library application keeps in SQLite.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{LedgerError, Result};
pub use store::{LoanLedger, SqliteLedger};
pub use types::{
    format_ledger_date, parse_ledger_date, DueLoan, LoanRecord, StudentContact, LEDGER_DATE_FORMAT,
};
