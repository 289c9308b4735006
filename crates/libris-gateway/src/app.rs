use axum::{
    routing::{get, post},
    Router,
};
use chrono::FixedOffset;
use libris_core::config::LibrisConfig;
use libris_mailer::{MailQueue, MailWorker, Mailer};
use libris_scheduler::{Clock, ReminderScanner};
use std::sync::Arc;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
///
/// Owns the one queue and the one worker of the process; everything else
/// reaches them through here.
pub struct AppState {
    pub config: LibrisConfig,
    pub queue: Arc<MailQueue>,
    pub mailer: Arc<Mailer>,
    pub worker: Arc<MailWorker>,
    pub scanner: Arc<ReminderScanner>,
    pub clock: Arc<dyn Clock>,
    /// Timezone for timestamps shown to people (test email, logs).
    pub offset: FixedOffset,
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/emails", post(crate::http::email::enqueue_handler))
        .route("/emails/assignment", post(crate::http::email::assignment_handler))
        .route("/emails/return", post(crate::http::email::return_handler))
        .route("/admin/test-email", post(crate::http::admin::test_email_handler))
        .route("/admin/email-status", get(crate::http::admin::email_status_handler))
        .route("/admin/reminders/run", post(crate::http::admin::run_reminders_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
