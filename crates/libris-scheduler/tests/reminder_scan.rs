//! Reminder scans against a real SQLite ledger and a recording transport.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{FixedOffset, TimeZone, Utc};
use libris_core::config::DeliveryMode;
use libris_ledger::{db::init_db, LoanLedger, SqliteLedger};
use libris_mailer::{
    EmailConfig, EmailTransport, Envelope, MailQueue, Mailer, StaticSource, TransportConnector,
    TransportError, TransportSpec,
};
use libris_scheduler::{ManualClock, ReminderScanner, ScanReport};

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<Envelope>>,
    /// Sending to this address panics inside the transport.
    panics_on: Mutex<Option<String>>,
}

struct OutboxTransport(Arc<Outbox>);

#[async_trait]
impl EmailTransport for OutboxTransport {
    fn name(&self) -> &'static str {
        "outbox"
    }

    async fn deliver(&self, envelope: &Envelope) -> Result<(), TransportError> {
        if self.0.panics_on.lock().unwrap().as_deref() == Some(envelope.to.as_str()) {
            panic!("transport blew up for {}", envelope.to);
        }
        self.0.sent.lock().unwrap().push(envelope.clone());
        Ok(())
    }
}

struct OutboxConnector(Arc<Outbox>);

impl TransportConnector for OutboxConnector {
    fn connect(&self, _spec: &TransportSpec) -> Result<Box<dyn EmailTransport>, TransportError> {
        Ok(Box::new(OutboxTransport(Arc::clone(&self.0))))
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    db_path: std::path::PathBuf,
    outbox: Arc<Outbox>,
    queue: Arc<MailQueue>,
    scanner: ReminderScanner,
}

/// "Today" is 2025-03-05 in EAT (10:00 UTC = 13:00 local).
fn fixture(delivery: DeliveryMode) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("library.db");
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    init_db(&conn).unwrap();
    conn.execute_batch(
        "INSERT INTO Login (name, userid, email) VALUES
            ('Amina Odhiambo', 'S001', 'amina@aoa.school'),
            ('Baraka Mwangi',  'S002', 'baraka@aoa.school'),
            ('Chiku Njeri',    'S003', NULL),
            ('Dalia Otieno',   'S004', 'dalia@aoa.school');
         INSERT INTO Book (title, serial, book_id) VALUES
            ('Things Fall Apart', 1, 'TFA-002'),
            ('The River Between', 2, 'TRB-011'),
            ('Weep Not, Child',   3, 'WNC-004'),
            ('Petals of Blood',   4, 'POB-007');",
    )
    .unwrap();
    drop(conn);

    let outbox = Arc::new(Outbox::default());
    let queue = Arc::new(MailQueue::new());
    let mailer = Arc::new(Mailer::new(
        Arc::new(StaticSource(Some(EmailConfig {
            enabled: true,
            smtp_server: Some("smtp.example.com".into()),
            smtp_port: 587,
            api_url: None,
            api_key: None,
            email_address: Some("library@aoa.school".into()),
            email_password: Some("secret".into()),
            library_name: "AOA Library".into(),
        }))),
        Arc::new(OutboxConnector(Arc::clone(&outbox))),
        Duration::from_secs(5),
    ));
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2025, 3, 5, 10, 0, 0).unwrap(),
    ));
    let ledger: Arc<dyn LoanLedger> = Arc::new(SqliteLedger::new(&db_path));
    let scanner = ReminderScanner::new(
        ledger,
        mailer,
        Arc::clone(&queue),
        clock,
        FixedOffset::east_opt(3 * 3600).unwrap(),
        delivery,
    );

    Fixture {
        _dir: dir,
        db_path,
        outbox,
        queue,
        scanner,
    }
}

fn lend(db: &Path, student: &str, serial: i64, book_id: &str, issue: &str, due: &str) {
    let conn = rusqlite::Connection::open(db).unwrap();
    conn.execute(
        "INSERT INTO BookIssue (stdid, serial, book_id, issue, exp) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![student, serial.to_string(), book_id, issue, due],
    )
    .unwrap();
}

fn sent(outbox: &Outbox) -> Vec<Envelope> {
    outbox.sent.lock().unwrap().clone()
}

#[tokio::test]
async fn loan_due_tomorrow_gets_one_reminder() {
    let f = fixture(DeliveryMode::Direct);
    lend(&f.db_path, "S001", 1, "TFA-002", "2025-02-20", "2025-03-06");

    let report = f.scanner.scan_due_tomorrow().await.unwrap();
    assert_eq!(
        report,
        ScanReport {
            matched: 1,
            notified: 1,
            failed: 0,
            skipped: 0
        }
    );

    let sent = sent(&f.outbox);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "amina@aoa.school");
    assert_eq!(sent[0].subject, "AOA Library - Book Due Tomorrow Reminder");
    assert!(sent[0].html_body.contains("Things Fall Apart"));
    assert!(sent[0].html_body.contains("March 06, 2025"));
}

#[tokio::test]
async fn loan_due_in_two_days_is_left_alone() {
    let f = fixture(DeliveryMode::Direct);
    lend(&f.db_path, "S001", 1, "TFA-002", "2025-02-20", "2025-03-07");

    let report = f.scanner.scan_due_tomorrow().await.unwrap();
    assert_eq!(report.matched, 0);
    assert!(sent(&f.outbox).is_empty());

    let report = f.scanner.scan_overdue().await.unwrap();
    assert_eq!(report.matched, 0);
    assert!(sent(&f.outbox).is_empty());
}

#[tokio::test]
async fn overdue_loan_reports_days_late() {
    let f = fixture(DeliveryMode::Direct);
    lend(&f.db_path, "S002", 2, "TRB-011", "2025-02-15", "2025-03-02");

    let report = f.scanner.scan_overdue().await.unwrap();
    assert_eq!(report.notified, 1);

    let sent = sent(&f.outbox);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "baraka@aoa.school");
    assert_eq!(sent[0].subject, "AOA Library - OVERDUE Book Reminder");
    assert!(sent[0].html_body.contains("3 day(s)"));
}

#[tokio::test]
async fn due_today_is_neither_tomorrow_nor_overdue() {
    let f = fixture(DeliveryMode::Direct);
    lend(&f.db_path, "S001", 1, "TFA-002", "2025-02-20", "2025-03-05");

    let daily = f.scanner.run_daily().await;
    assert_eq!(daily.due_tomorrow.unwrap().matched, 0);
    assert_eq!(daily.overdue.unwrap().matched, 0);
    assert!(sent(&f.outbox).is_empty());
}

#[tokio::test]
async fn missing_email_is_skipped_without_aborting() {
    let f = fixture(DeliveryMode::Direct);
    lend(&f.db_path, "S003", 3, "WNC-004", "2025-02-10", "2025-03-01");
    lend(&f.db_path, "S004", 4, "POB-007", "2025-02-10", "2025-03-03");

    let report = f.scanner.scan_overdue().await.unwrap();
    assert_eq!(
        report,
        ScanReport {
            matched: 2,
            notified: 1,
            failed: 0,
            skipped: 1
        }
    );

    let sent = sent(&f.outbox);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "dalia@aoa.school");
    assert!(sent[0].html_body.contains("2 day(s)"));
}

#[tokio::test]
async fn only_an_unreadable_due_date_skips_a_loan() {
    let f = fixture(DeliveryMode::Direct);
    lend(&f.db_path, "S001", 1, "TFA-002", "last week", "2025-03-01");
    lend(&f.db_path, "S002", 2, "TRB-011", "2025-02-15", "2025-03-02");
    lend(&f.db_path, "S004", 4, "POB-007", "2025-02-10", "03/01/2025");

    let report = f.scanner.scan_overdue().await.unwrap();
    assert_eq!(
        report,
        ScanReport {
            matched: 3,
            notified: 2,
            failed: 0,
            skipped: 1
        }
    );

    let sent = sent(&f.outbox);
    let recipients: Vec<_> = sent.iter().map(|e| e.to.as_str()).collect();
    assert_eq!(recipients, ["amina@aoa.school", "baraka@aoa.school"]);
    assert!(sent[0].html_body.contains("Date Borrowed:</strong> last week"));
    assert!(sent[0].html_body.contains("4 day(s)"));
}

#[tokio::test]
async fn panicking_send_counts_as_failed_and_scan_continues() {
    let f = fixture(DeliveryMode::Direct);
    *f.outbox.panics_on.lock().unwrap() = Some("amina@aoa.school".into());
    lend(&f.db_path, "S001", 1, "TFA-002", "2025-02-10", "2025-03-01");
    lend(&f.db_path, "S002", 2, "TRB-011", "2025-02-15", "2025-03-02");

    let report = f.scanner.scan_overdue().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.notified, 1);

    let sent = sent(&f.outbox);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "baraka@aoa.school");
}

#[tokio::test]
async fn run_daily_covers_both_scans() {
    let f = fixture(DeliveryMode::Direct);
    lend(&f.db_path, "S001", 1, "TFA-002", "2025-02-20", "2025-03-06");
    lend(&f.db_path, "S002", 2, "TRB-011", "2025-02-15", "2025-03-02");

    let daily = f.scanner.run_daily().await;
    assert_eq!(daily.due_tomorrow.unwrap().notified, 1);
    assert_eq!(daily.overdue.unwrap().notified, 1);

    let subjects: Vec<_> = sent(&f.outbox).into_iter().map(|e| e.subject).collect();
    assert_eq!(
        subjects,
        [
            "AOA Library - Book Due Tomorrow Reminder",
            "AOA Library - OVERDUE Book Reminder"
        ]
    );
}

#[tokio::test]
async fn queued_delivery_enqueues_in_scan_order() {
    let f = fixture(DeliveryMode::Queued);
    lend(&f.db_path, "S001", 1, "TFA-002", "2025-02-10", "2025-03-01");
    lend(&f.db_path, "S002", 2, "TRB-011", "2025-02-15", "2025-03-02");

    let report = f.scanner.scan_overdue().await.unwrap();
    assert_eq!(report.notified, 2);
    assert!(sent(&f.outbox).is_empty());

    assert_eq!(f.queue.len(), 2);
    assert_eq!(f.queue.try_dequeue().unwrap().to, "amina@aoa.school");
    assert_eq!(f.queue.try_dequeue().unwrap().to, "baraka@aoa.school");
}

#[tokio::test]
async fn unreadable_ledger_fails_both_scans_without_panicking() {
    let f = fixture(DeliveryMode::Direct);
    std::fs::remove_file(&f.db_path).unwrap();

    let daily = f.scanner.run_daily().await;
    assert!(daily.due_tomorrow.is_none());
    assert!(daily.overdue.is_none());
}
