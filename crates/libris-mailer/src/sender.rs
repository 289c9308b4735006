use std::sync::Arc;
use std::time::Duration;

use libris_core::config::EmailSettings;
use libris_core::OutboundMessage;
use tracing::{debug, info, warn};

use crate::address::sanitize_address;
use crate::error::{SendError, TransportError};
use crate::settings::{
    EmailConfig, EmailConfigSource, EmailStatus, EnvFileSource, DEFAULT_LIBRARY_NAME,
};
use crate::transport::{DefaultConnector, Envelope, TransportConnector};

/// The synchronous send path.
///
/// Credentials are resolved from `source` on every call and a transport is
/// built from them, so nothing about the provider is held between sends.
pub struct Mailer {
    source: Arc<dyn EmailConfigSource>,
    connector: Arc<dyn TransportConnector>,
    send_timeout: Duration,
}

impl Mailer {
    pub fn new(
        source: Arc<dyn EmailConfigSource>,
        connector: Arc<dyn TransportConnector>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            source,
            connector,
            send_timeout,
        }
    }

    /// Production wiring: env/file credentials, lettre/reqwest transports.
    pub fn from_settings(settings: &EmailSettings) -> Self {
        Self::new(
            Arc::new(EnvFileSource::new(&settings.config_file)),
            Arc::new(DefaultConnector::new()),
            Duration::from_secs(settings.send_timeout_secs),
        )
    }

    /// Freshly resolved settings, if any.
    pub fn config(&self) -> Option<EmailConfig> {
        self.source.resolve().map(|r| r.config)
    }

    /// Library display name for subjects and templates.
    pub fn library_name(&self) -> String {
        self.config()
            .map(|c| c.library_name)
            .unwrap_or_else(|| DEFAULT_LIBRARY_NAME.to_string())
    }

    pub fn status(&self) -> EmailStatus {
        match self.source.resolve() {
            Some(resolved) => resolved.config.status(&resolved.origin),
            None => EmailStatus::unconfigured(),
        }
    }

    /// Send one email now and report success as a boolean. Every failure is
    /// logged with its reason; none is raised to the caller.
    pub async fn send_now(&self, to: &str, subject: &str, html_body: &str) -> bool {
        match self.try_send(to, subject, html_body).await {
            Ok(()) => true,
            Err(e) => {
                warn!(code = e.code(), error = %e, "email not sent");
                false
            }
        }
    }

    /// Deliver a queued message.
    pub async fn deliver(&self, message: &OutboundMessage) -> Result<(), SendError> {
        self.try_send(&message.to, &message.subject, &message.html_body)
            .await
    }

    /// Send one email now, returning the reason on failure.
    ///
    /// Checks, in order: config present, sending enabled, sender set,
    /// transport credentials complete, recipient sanitisable. Only then is
    /// the transport called, bounded by the send timeout.
    pub async fn try_send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), SendError> {
        let config = self.config().ok_or(SendError::ConfigMissing)?;
        if !config.enabled {
            return Err(SendError::Disabled);
        }
        let from = config.sender().ok_or(SendError::MissingSender)?.to_string();
        let spec = config.transport_spec()?;

        debug!(
            transport = spec.kind(),
            from = %from,
            "email config loaded"
        );

        let to = sanitize_address(to).ok_or(SendError::InvalidRecipient)?;
        let transport = self.connector.connect(&spec)?;
        let envelope = Envelope {
            from,
            to,
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        };

        info!(to = %envelope.to, transport = transport.name(), "sending email");
        match tokio::time::timeout(self.send_timeout, transport.deliver(&envelope)).await {
            Ok(Ok(())) => {
                info!(to = %envelope.to, "email sent");
                Ok(())
            }
            Ok(Err(e)) => Err(SendError::Transport(e)),
            Err(_) => Err(SendError::Transport(TransportError::Timeout {
                secs: self.send_timeout.as_secs(),
            })),
        }
    }
}
