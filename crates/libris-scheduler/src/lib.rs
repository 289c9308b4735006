//! `libris-scheduler` — daily due/overdue reminder scans.
//!
//! # Overview
//!
//! The [`engine::SchedulerEngine`] polls its [`clock::Clock`] (once a minute
//! by default) and, when the configured local time of day has passed, runs
//! both scans of the [`scanner::ReminderScanner`] in sequence. Missed fire
//! times are never replayed: the next one is always computed forward from
//! "now".
//!
//! | Scan           | Ledger query            | Template                 |
//! |----------------|-------------------------|--------------------------|
//! | due tomorrow   | `due_date == today + 1` | amber "due tomorrow"     |
//! | overdue        | `due_date < today`      | red "OVERDUE", N day(s)  |

pub mod clock;
pub mod engine;
pub mod error;
pub mod scanner;
pub mod schedule;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::SchedulerEngine;
pub use error::{Result, SchedulerError};
pub use scanner::{DailyReport, ReminderScanner, ScanReport};
pub use schedule::DailySchedule;
