//! SMTP transport (STARTTLS relay with login credentials) built on lettre.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::error::TransportError;
use crate::transport::{EmailTransport, Envelope};

/// Wraps `lettre::AsyncSmtpTransport<Tokio1Executor>`.
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpTransport {
    /// Build a STARTTLS transport for `server:port`, authenticating as
    /// `username`. No connection is opened until the first send.
    pub fn new(
        server: &str,
        port: u16,
        username: &str,
        password: &str,
    ) -> Result<Self, TransportError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server)
            .map_err(|e| TransportError::InvalidConfiguration(e.to_string()))?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        Ok(Self { transport })
    }
}

#[async_trait]
impl EmailTransport for SmtpTransport {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn deliver(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let message = build_message(envelope)?;

        self.transport.send(message).await.map_err(|e| {
            let msg = e.to_string();
            if msg.contains("535") || msg.to_ascii_lowercase().contains("authentication") {
                TransportError::AuthFailed(msg)
            } else if msg.to_ascii_lowercase().contains("connection")
                || msg.to_ascii_lowercase().contains("timed out")
            {
                TransportError::ConnectionFailed(msg)
            } else {
                TransportError::SendFailed(msg)
            }
        })?;

        Ok(())
    }
}

fn build_message(envelope: &Envelope) -> Result<Message, TransportError> {
    let from: Mailbox = envelope
        .from
        .parse()
        .map_err(|e| TransportError::InvalidConfiguration(format!("invalid from address: {e}")))?;
    let to: Mailbox = envelope
        .to
        .parse()
        .map_err(|e| TransportError::SendFailed(format!("invalid to address: {e}")))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(envelope.subject.as_str())
        .header(ContentType::TEXT_HTML)
        .body(envelope.html_body.clone())
        .map_err(|e| TransportError::SendFailed(format!("failed to build message: {e}")))
}
