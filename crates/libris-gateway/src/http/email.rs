//! Queueing endpoints.
//!
//! `POST /emails` takes a ready subject and body; `/emails/assignment` and
//! `/emails/return` render the confirmation templates first. All three reply
//! `202 {"status": "queued", "id": "...", "queue_depth": N}`.
//!
//! Enqueue never fails; address checks happen when the worker sends.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::NaiveDate;
use libris_mailer::templates::{self, BookLine, RenderedEmail};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::app::AppState;
use crate::auth::require_auth;
use crate::http::{api_error, ApiResult};

#[derive(Deserialize)]
pub struct EnqueueRequest {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

#[derive(Serialize)]
pub struct EnqueueReply {
    pub status: &'static str,
    pub id: String,
    pub queue_depth: usize,
}

#[derive(Deserialize)]
pub struct BookItem {
    pub title: String,
    pub book_id: String,
}

#[derive(Deserialize)]
pub struct AssignmentRequest {
    pub to: String,
    pub student_name: String,
    pub books: Vec<BookItem>,
    pub borrowed_on: NaiveDate,
    pub return_by: NaiveDate,
    pub assigned_by: String,
}

#[derive(Deserialize)]
pub struct ReturnRequest {
    pub to: String,
    pub student_name: String,
    pub books: Vec<BookItem>,
    pub borrowed_on: NaiveDate,
    pub returned_on: NaiveDate,
    pub returned_by: String,
}

pub async fn enqueue_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<EnqueueRequest>,
) -> ApiResult<(StatusCode, Json<EnqueueReply>)> {
    require_auth(&state, &headers)?;

    let email = RenderedEmail {
        subject: req.subject,
        html_body: req.html_body,
    };
    Ok(queue_email(&state, req.to, email))
}

/// POST /emails/assignment — confirmation for copies just lent out.
pub async fn assignment_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AssignmentRequest>,
) -> ApiResult<(StatusCode, Json<EnqueueReply>)> {
    require_auth(&state, &headers)?;
    let books = book_lines(&req.books)?;

    let email = templates::assignment_confirmation(
        &state.mailer.library_name(),
        &req.student_name,
        &books,
        req.borrowed_on,
        req.return_by,
        &req.assigned_by,
    );
    Ok(queue_email(&state, req.to, email))
}

/// POST /emails/return — confirmation for copies handed back.
pub async fn return_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ReturnRequest>,
) -> ApiResult<(StatusCode, Json<EnqueueReply>)> {
    require_auth(&state, &headers)?;
    let books = book_lines(&req.books)?;

    let email = templates::return_confirmation(
        &state.mailer.library_name(),
        &req.student_name,
        &books,
        req.borrowed_on,
        req.returned_on,
        &req.returned_by,
    );
    Ok(queue_email(&state, req.to, email))
}

fn book_lines(books: &[BookItem]) -> ApiResult<Vec<BookLine<'_>>> {
    if books.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "books cannot be empty"));
    }
    Ok(books
        .iter()
        .map(|b| BookLine {
            title: &b.title,
            book_id: &b.book_id,
        })
        .collect())
}

fn queue_email(
    state: &AppState,
    to: String,
    email: RenderedEmail,
) -> (StatusCode, Json<EnqueueReply>) {
    let id = state.queue.enqueue_email(to, email.subject, email.html_body);
    let queue_depth = state.queue.len();
    info!(message_id = %id, queue_depth, "email accepted for delivery");

    (
        StatusCode::ACCEPTED,
        Json(EnqueueReply {
            status: "queued",
            id: id.to_string(),
            queue_depth,
        }),
    )
}
