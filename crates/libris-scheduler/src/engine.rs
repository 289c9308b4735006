use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::clock::Clock;
use crate::scanner::{DailyReport, ReminderScanner};
use crate::schedule::DailySchedule;

/// Drives the daily reminder run.
///
/// Polls the clock every `poll` and fires when the stored next-fire instant
/// has passed. After a fire the next instant is recomputed from the clock's
/// current time, so a long outage produces one run, not one per missed day.
pub struct SchedulerEngine {
    scanner: Arc<ReminderScanner>,
    schedule: DailySchedule,
    clock: Arc<dyn Clock>,
    poll: Duration,
    next_fire: DateTime<Utc>,
}

impl SchedulerEngine {
    pub fn new(
        scanner: Arc<ReminderScanner>,
        schedule: DailySchedule,
        clock: Arc<dyn Clock>,
        poll: Duration,
    ) -> Self {
        let next_fire = schedule.next_fire_after(clock.now());
        Self {
            scanner,
            schedule,
            clock,
            poll,
            next_fire,
        }
    }

    pub fn next_fire(&self) -> DateTime<Utc> {
        self.next_fire
    }

    /// Run the daily checks if the fire time has arrived.
    ///
    /// The run happens on its own task; if it panics the trigger still
    /// counts as fired and the report has neither scan.
    pub async fn poll_once(&mut self) -> Option<DailyReport> {
        let now = self.clock.now();
        if now < self.next_fire {
            return None;
        }

        info!(scheduled = %self.next_fire, "reminder trigger fired");
        let scanner = Arc::clone(&self.scanner);
        let report = match tokio::spawn(async move { scanner.run_daily().await }).await {
            Ok(report) => report,
            Err(e) => {
                error!("daily reminder run panicked: {e}");
                DailyReport::default()
            }
        };

        self.next_fire = self.schedule.next_fire_after(self.clock.now());
        info!(next = %self.next_fire, "next reminder run scheduled");
        Some(report)
    }

    /// Main loop. Polls until `shutdown` broadcasts `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            schedule = %self.schedule,
            next = %self.next_fire,
            "reminder scheduler started"
        );

        let mut interval = tokio::time::interval(self.poll.max(Duration::from_millis(10)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.poll_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("reminder scheduler shutting down");
                        break;
                    }
                }
            }
        }
    }
}
