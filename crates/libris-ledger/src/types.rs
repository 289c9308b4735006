use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Dates are stored and compared as `YYYY-MM-DD` calendar strings.
pub const LEDGER_DATE_FORMAT: &str = "%Y-%m-%d";

/// An open loan of one physical copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub student_id: String,
    pub book_copy_id: String,
    pub book_title: String,
    /// Raw ledger value; see [`LoanRecord::issue_date`].
    pub issue_date: String,
    pub due_date: String,
}

impl LoanRecord {
    /// `None` when the stored value is not a `YYYY-MM-DD` date.
    pub fn issue_date(&self) -> Option<NaiveDate> {
        parse_ledger_date(&self.issue_date)
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        parse_ledger_date(&self.due_date)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentContact {
    pub student_id: String,
    pub name: String,
    pub email: Option<String>,
}

/// A loan joined with the borrower's contact details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DueLoan {
    pub loan: LoanRecord,
    pub contact: StudentContact,
}

impl DueLoan {
    /// The borrower's email, if present and non-blank.
    pub fn email(&self) -> Option<&str> {
        self.contact
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

pub fn parse_ledger_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), LEDGER_DATE_FORMAT).ok()
}

pub fn format_ledger_date(date: NaiveDate) -> String {
    date.format(LEDGER_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn due_loan(email: Option<&str>) -> DueLoan {
        DueLoan {
            loan: LoanRecord {
                student_id: "S001".into(),
                book_copy_id: "TFA-002".into(),
                book_title: "Things Fall Apart".into(),
                issue_date: "2025-03-01".into(),
                due_date: "not a date".into(),
            },
            contact: StudentContact {
                student_id: "S001".into(),
                name: "Amina".into(),
                email: email.map(str::to_string),
            },
        }
    }

    #[test]
    fn parses_calendar_strings() {
        let loan = due_loan(None).loan;
        assert_eq!(loan.issue_date(), NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(loan.due_date(), None);
    }

    #[test]
    fn formats_with_zero_padding() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        assert_eq!(format_ledger_date(date), "2025-03-05");
    }

    #[test]
    fn blank_email_counts_as_missing() {
        assert_eq!(due_loan(None).email(), None);
        assert_eq!(due_loan(Some("  ")).email(), None);
        assert_eq!(due_loan(Some("a@aoa.school")).email(), Some("a@aoa.school"));
    }
}
