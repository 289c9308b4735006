//! Fixed HTML bodies for reminder and confirmation emails.
//!
//! Every interpolated value passes through [`html_escape`]; dates render as
//! `"%B %d, %Y"` (e.g. `March 05, 2025`).

use chrono::{DateTime, NaiveDate, TimeZone};

const DISPLAY_DATE: &str = "%B %d, %Y";

const AMBER: &str = "#E8A71D";
const RED: &str = "#C0392B";
const GREEN: &str = "#265530";
const LIGHT_GREEN: &str = "#64A772";

/// A subject plus HTML body, ready for [`Mailer::send_now`](crate::Mailer::send_now)
/// or [`MailQueue::enqueue_email`](crate::MailQueue::enqueue_email).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html_body: String,
}

/// One loan as it appears in a reminder.
#[derive(Debug, Clone, Copy)]
pub struct LoanDetails<'a> {
    pub student_name: &'a str,
    pub book_title: &'a str,
    pub book_id: &'a str,
    pub issue_date: LedgerDate<'a>,
    pub due_date: NaiveDate,
}

/// A ledger date that may not have parsed.
#[derive(Debug, Clone, Copy)]
pub enum LedgerDate<'a> {
    Parsed(NaiveDate),
    /// Raw column text, escaped on render.
    Raw(&'a str),
}

impl LedgerDate<'_> {
    fn render(&self) -> String {
        match self {
            LedgerDate::Parsed(date) => display_date(*date),
            LedgerDate::Raw(raw) => html_escape(raw),
        }
    }
}

impl From<NaiveDate> for LedgerDate<'_> {
    fn from(date: NaiveDate) -> Self {
        LedgerDate::Parsed(date)
    }
}

/// One copy in an assignment or return confirmation.
#[derive(Debug, Clone, Copy)]
pub struct BookLine<'a> {
    pub title: &'a str,
    pub book_id: &'a str,
}

pub fn display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE).to_string()
}

pub fn html_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn wrap(heading: &str, accent: &str, border: &str, inner: &str) -> String {
    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
  <div style="max-width: 600px; margin: 0 auto; padding: 20px; background-color: #f9f9f9; border-radius: 10px;">
    <h2 style="color: {accent}; border-bottom: 3px solid {border}; padding-bottom: 10px;">{heading}</h2>
{inner}
  </div>
</body>
</html>"#
    )
}

fn book_list(books: &[BookLine<'_>]) -> String {
    let items: String = books
        .iter()
        .map(|b| {
            format!(
                "<li><strong>{}</strong> (Book ID: {})</li>",
                html_escape(b.title),
                html_escape(b.book_id)
            )
        })
        .collect();
    format!("<ul>{items}</ul>")
}

pub fn due_tomorrow(library: &str, loan: &LoanDetails<'_>) -> RenderedEmail {
    let inner = format!(
        r#"    <p>Dear <strong>{name}</strong>,</p>
    <p>This is a friendly reminder that the following book is <strong style="color: {AMBER};">due tomorrow</strong>:</p>
    <div style="background-color: #fff; padding: 15px; border-left: 4px solid {AMBER}; margin: 20px 0;">
      <p><strong>Book Title:</strong> {title}</p>
      <p><strong>Book ID:</strong> {book_id}</p>
      <p><strong>Date Borrowed:</strong> {issued}</p>
      <p><strong>Due Date:</strong> <span style="color: {AMBER}; font-weight: bold;">{due}</span></p>
    </div>
    <p style="background-color: #FFF3CD; padding: 12px; border-radius: 5px; border-left: 4px solid {AMBER};">
      <strong>Please return this book tomorrow</strong> to avoid any late penalties.
    </p>
    <p>If you need to extend your borrowing period, please consult the library staff as soon as possible.</p>
    <p>Thank you for your attention to this matter.</p>"#,
        name = html_escape(loan.student_name),
        title = html_escape(loan.book_title),
        book_id = html_escape(loan.book_id),
        issued = loan.issue_date.render(),
        due = display_date(loan.due_date),
    );

    RenderedEmail {
        subject: format!("{library} - Book Due Tomorrow Reminder"),
        html_body: wrap("Book Due Tomorrow Reminder", AMBER, AMBER, &inner),
    }
}

pub fn overdue(library: &str, loan: &LoanDetails<'_>, days_overdue: i64) -> RenderedEmail {
    let inner = format!(
        r#"    <p>Dear <strong>{name}</strong>,</p>
    <p style="color: {RED}; font-weight: bold;">This is an important notice that the following book is now OVERDUE:</p>
    <div style="background-color: #fff; padding: 15px; border-left: 4px solid {RED}; margin: 20px 0;">
      <p><strong>Book Title:</strong> {title}</p>
      <p><strong>Book ID:</strong> {book_id}</p>
      <p><strong>Date Borrowed:</strong> {issued}</p>
      <p><strong>Was Due:</strong> <span style="color: {RED}; font-weight: bold;">{due}</span></p>
      <p><strong>Days Overdue:</strong> <span style="color: {RED}; font-weight: bold; font-size: 18px;">{days_overdue} day(s)</span></p>
    </div>
    <p>If you have already returned this book, please disregard this message. Otherwise, please return it immediately or contact the library staff.</p>
    <p>Thank you for your prompt attention to this matter.</p>"#,
        name = html_escape(loan.student_name),
        title = html_escape(loan.book_title),
        book_id = html_escape(loan.book_id),
        issued = loan.issue_date.render(),
        due = display_date(loan.due_date),
    );

    RenderedEmail {
        subject: format!("{library} - OVERDUE Book Reminder"),
        html_body: wrap("OVERDUE Book Notice", RED, RED, &inner),
    }
}

pub fn assignment_confirmation(
    library: &str,
    student_name: &str,
    books: &[BookLine<'_>],
    borrowed_on: NaiveDate,
    return_by: NaiveDate,
    assigned_by: &str,
) -> RenderedEmail {
    let library_html = html_escape(library);
    let inner = format!(
        r#"    <p>Dear <strong>{name}</strong>,</p>
    <p>This is to confirm that the following book(s) have been assigned to you from the {library_html}:</p>
    {list}
    <div style="background-color: #fff; padding: 15px; border-left: 4px solid {AMBER}; margin: 20px 0;">
      <p style="margin: 5px 0;"><strong>Date Borrowed:</strong> {borrowed}</p>
      <p style="margin: 5px 0;"><strong>Return Date:</strong> <span style="color: #C87140; font-weight: bold;">{return_by}</span></p>
      <p style="margin: 5px 0;"><strong>Assigned By:</strong> {assigned_by}</p>
    </div>
    <p style="color: {RED}; font-weight: bold;">Please return the book(s) by the date mentioned above to avoid any penalties.</p>
    <p>If you have any questions, please contact the library staff.</p>"#,
        name = html_escape(student_name),
        list = book_list(books),
        borrowed = display_date(borrowed_on),
        return_by = display_date(return_by),
        assigned_by = html_escape(assigned_by),
    );

    RenderedEmail {
        subject: format!("{library} - Book Assignment Confirmation"),
        html_body: wrap("Book Assignment Confirmation", GREEN, LIGHT_GREEN, &inner),
    }
}

pub fn return_confirmation(
    library: &str,
    student_name: &str,
    books: &[BookLine<'_>],
    borrowed_on: NaiveDate,
    returned_on: NaiveDate,
    returned_by: &str,
) -> RenderedEmail {
    let library_html = html_escape(library);
    let inner = format!(
        r#"    <p>Dear <strong>{name}</strong>,</p>
    <p style="color: #27ae60; font-weight: bold;">Thank you! You have successfully returned the following book(s) to the {library_html}:</p>
    {list}
    <div style="background-color: #fff; padding: 15px; border-left: 4px solid {LIGHT_GREEN}; margin: 20px 0;">
      <p style="margin: 5px 0;"><strong>Date Borrowed:</strong> {borrowed}</p>
      <p style="margin: 5px 0;"><strong>Date Returned:</strong> {returned}</p>
      <p style="margin: 5px 0;"><strong>Processed By:</strong> {returned_by}</p>
    </div>
    <p>Your return has been recorded in our system. You are welcome to borrow more books anytime!</p>
    <p>Thank you for using the {library_html}.</p>"#,
        name = html_escape(student_name),
        list = book_list(books),
        borrowed = display_date(borrowed_on),
        returned = display_date(returned_on),
        returned_by = html_escape(returned_by),
    );

    RenderedEmail {
        subject: format!("{library} - Book Return Confirmation"),
        html_body: wrap("Book Return Confirmation", GREEN, LIGHT_GREEN, &inner),
    }
}

/// The admin "is email working?" message, stamped with the local send time.
pub fn test_email<Tz>(library: &str, sent_at: DateTime<Tz>) -> RenderedEmail
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let library_html = html_escape(library);
    let inner = format!(
        "    <p>If you received this email, your email configuration is working correctly!</p>\n    <p>Time: {}</p>",
        sent_at.format("%Y-%m-%d %H:%M:%S")
    );

    RenderedEmail {
        subject: format!("{library} - Test Email"),
        html_body: wrap(
            &format!("Test Email from {library_html} System"),
            GREEN,
            LIGHT_GREEN,
            &inner,
        ),
    }
}
