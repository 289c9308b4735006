use std::sync::Arc;

use chrono::{Duration, FixedOffset, NaiveDate};
use libris_core::config::DeliveryMode;
use libris_ledger::{DueLoan, LoanLedger};
use libris_mailer::templates::{self, LedgerDate, LoanDetails, RenderedEmail};
use libris_mailer::{MailQueue, Mailer};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::clock::Clock;
use crate::error::{Result, SchedulerError};

/// Outcome counts for one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Loans the ledger returned.
    pub matched: usize,
    /// Sent successfully (direct) or enqueued (queued).
    pub notified: usize,
    /// Direct sends that returned false or panicked.
    pub failed: usize,
    /// No email on file, or an unreadable due date.
    pub skipped: usize,
}

/// Both scans of one daily run. A scan that could not run at all is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DailyReport {
    pub due_tomorrow: Option<ScanReport>,
    pub overdue: Option<ScanReport>,
}

#[derive(Clone, Copy)]
enum Reminder {
    DueTomorrow,
    Overdue { today: NaiveDate },
}

/// Finds loans due tomorrow or already overdue and notifies each borrower.
pub struct ReminderScanner {
    ledger: Arc<dyn LoanLedger>,
    mailer: Arc<Mailer>,
    queue: Arc<MailQueue>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
    delivery: DeliveryMode,
}

impl ReminderScanner {
    pub fn new(
        ledger: Arc<dyn LoanLedger>,
        mailer: Arc<Mailer>,
        queue: Arc<MailQueue>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
        delivery: DeliveryMode,
    ) -> Self {
        Self {
            ledger,
            mailer,
            queue,
            clock,
            offset,
            delivery,
        }
    }

    /// Notify every borrower whose loan is due on tomorrow's date.
    #[instrument(skip(self))]
    pub async fn scan_due_tomorrow(&self) -> Result<ScanReport> {
        let tomorrow = self.clock.today(self.offset) + Duration::days(1);
        let ledger = Arc::clone(&self.ledger);
        let loans = blocking(move || ledger.due_on(tomorrow)).await?;

        let report = self.notify_all(&loans, Reminder::DueTomorrow).await;
        info!(%tomorrow, ?report, "due-tomorrow scan finished");
        Ok(report)
    }

    /// Notify every borrower whose loan was due before today.
    #[instrument(skip(self))]
    pub async fn scan_overdue(&self) -> Result<ScanReport> {
        let today = self.clock.today(self.offset);
        let ledger = Arc::clone(&self.ledger);
        let loans = blocking(move || ledger.due_before(today)).await?;

        let report = self.notify_all(&loans, Reminder::Overdue { today }).await;
        info!(%today, ?report, "overdue scan finished");
        Ok(report)
    }

    /// Both scans in sequence. An error in one is logged and does not stop
    /// the other.
    pub async fn run_daily(&self) -> DailyReport {
        info!(at = %self.clock.now().with_timezone(&self.offset), "running daily reminder checks");

        let due_tomorrow = match self.scan_due_tomorrow().await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("due-tomorrow scan failed: {e}");
                None
            }
        };
        let overdue = match self.scan_overdue().await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("overdue scan failed: {e}");
                None
            }
        };

        let report = DailyReport {
            due_tomorrow,
            overdue,
        };
        info!(?report, "reminder checks completed");
        report
    }

    async fn notify_all(&self, loans: &[DueLoan], kind: Reminder) -> ScanReport {
        let library = self.mailer.library_name();
        let mut report = ScanReport {
            matched: loans.len(),
            ..Default::default()
        };

        for due in loans {
            let Some(email) = due.email() else {
                report.skipped += 1;
                continue;
            };
            let Some(due_date) = due.loan.due_date() else {
                warn!(
                    student_id = %due.contact.student_id,
                    book_id = %due.loan.book_copy_id,
                    due = %due.loan.due_date,
                    "skipping loan with unreadable due date"
                );
                report.skipped += 1;
                continue;
            };
            // Display only; shown as stored when it does not parse.
            let issue_date = match due.loan.issue_date() {
                Some(date) => LedgerDate::Parsed(date),
                None => {
                    warn!(
                        book_id = %due.loan.book_copy_id,
                        issue = %due.loan.issue_date,
                        "unreadable issue date"
                    );
                    LedgerDate::Raw(&due.loan.issue_date)
                }
            };

            let details = LoanDetails {
                student_name: &due.contact.name,
                book_title: &due.loan.book_title,
                book_id: &due.loan.book_copy_id,
                issue_date,
                due_date,
            };
            let rendered = match kind {
                Reminder::DueTomorrow => templates::due_tomorrow(&library, &details),
                Reminder::Overdue { today } => {
                    templates::overdue(&library, &details, (today - due_date).num_days())
                }
            };

            if self.deliver(email, rendered).await {
                info!(student = %due.contact.name, to = %email, "reminder sent");
                report.notified += 1;
            } else {
                report.failed += 1;
            }
        }

        report
    }

    async fn deliver(&self, to: &str, email: RenderedEmail) -> bool {
        match self.delivery {
            DeliveryMode::Direct => {
                let mailer = Arc::clone(&self.mailer);
                let recipient = to.to_string();
                let send = async move {
                    mailer
                        .send_now(&recipient, &email.subject, &email.html_body)
                        .await
                };
                match tokio::spawn(send).await {
                    Ok(sent) => sent,
                    Err(e) => {
                        error!(to = %to, "reminder send panicked: {e}");
                        false
                    }
                }
            }
            DeliveryMode::Queued => {
                self.queue.enqueue_email(to, email.subject, email.html_body);
                true
            }
        }
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> libris_ledger::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| SchedulerError::Task(e.to_string()))?
        .map_err(SchedulerError::from)
}
