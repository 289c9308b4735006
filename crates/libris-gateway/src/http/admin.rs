//! Admin endpoints: test email, email config status, manual reminder run.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use libris_mailer::{templates, EmailStatus};
use libris_scheduler::DailyReport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::app::AppState;
use crate::auth::require_auth;
use crate::http::{api_error, ApiResult};

#[derive(Deserialize)]
pub struct TestEmailRequest {
    #[serde(default)]
    pub to: String,
}

#[derive(Serialize)]
pub struct TestEmailReply {
    pub sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// POST /admin/test-email — send the test template right now.
///
/// `200 {"sent": true}` on success, `502 {"sent": false, "code": ..}` when
/// the send fails, `400` when `to` is blank.
pub async fn test_email_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<TestEmailRequest>,
) -> ApiResult<(StatusCode, Json<TestEmailReply>)> {
    require_auth(&state, &headers)?;

    let to = req.to.trim();
    if to.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "to cannot be empty"));
    }

    let now = state.clock.now().with_timezone(&state.offset);
    let email = templates::test_email(&state.mailer.library_name(), now);

    match state.mailer.try_send(to, &email.subject, &email.html_body).await {
        Ok(()) => {
            info!(to = %to, "test email sent");
            Ok((
                StatusCode::OK,
                Json(TestEmailReply {
                    sent: true,
                    code: None,
                    error: None,
                }),
            ))
        }
        Err(e) => {
            warn!(to = %to, code = e.code(), error = %e, "test email failed");
            Ok((
                StatusCode::BAD_GATEWAY,
                Json(TestEmailReply {
                    sent: false,
                    code: Some(e.code()),
                    error: Some(e.to_string()),
                }),
            ))
        }
    }
}

#[derive(Serialize)]
pub struct EmailStatusReply {
    #[serde(flatten)]
    pub email: EmailStatus,
    pub queue_depth: usize,
    pub worker_running: bool,
}

/// GET /admin/email-status — where credentials come from, never the secrets.
pub async fn email_status_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<EmailStatusReply>> {
    require_auth(&state, &headers)?;

    Ok(Json(EmailStatusReply {
        email: state.mailer.status(),
        queue_depth: state.queue.len(),
        worker_running: state.worker.is_running(),
    }))
}

/// POST /admin/reminders/run — both scans now, outside the daily schedule.
pub async fn run_reminders_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<DailyReport>> {
    require_auth(&state, &headers)?;

    info!("manual reminder run requested");
    Ok(Json(state.scanner.run_daily().await))
}
