use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier attached to every outbound message (UUIDv7 — time-sortable for
/// log correlation between enqueue and delivery).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// One email waiting to be delivered. Lives only in memory: a message that
/// is queued but not yet sent is lost on process exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: MessageId,
    /// Raw recipient as supplied by the producer; sanitised at send time.
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub created_at: DateTime<Utc>,
}

impl OutboundMessage {
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            to: to.into(),
            subject: subject.into(),
            html_body: html_body.into(),
            created_at: Utc::now(),
        }
    }
}
