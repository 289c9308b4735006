use std::fmt;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http_api::HttpApiTransport;
use crate::smtp::SmtpTransport;

/// A fully checked message ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    /// Already sanitised.
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Delivers one message through an external provider.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Stable lowercase identifier (`"smtp"`, `"http_api"`).
    fn name(&self) -> &'static str;

    async fn deliver(&self, envelope: &Envelope) -> Result<(), TransportError>;
}

/// Which transport a config selects, with the credentials it needs.
#[derive(Clone, PartialEq, Eq)]
pub enum TransportSpec {
    Smtp {
        server: String,
        port: u16,
        username: String,
        password: String,
    },
    HttpApi {
        url: String,
        api_key: String,
    },
}

impl TransportSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            TransportSpec::Smtp { .. } => "smtp",
            TransportSpec::HttpApi { .. } => "http_api",
        }
    }
}

impl fmt::Debug for TransportSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportSpec::Smtp { server, port, username, .. } => f
                .debug_struct("Smtp")
                .field("server", server)
                .field("port", port)
                .field("username", username)
                .finish_non_exhaustive(),
            TransportSpec::HttpApi { url, .. } => f
                .debug_struct("HttpApi")
                .field("url", url)
                .finish_non_exhaustive(),
        }
    }
}

/// Builds a transport for a given spec. Called on every send, since the
/// spec comes from freshly loaded credentials.
pub trait TransportConnector: Send + Sync {
    fn connect(&self, spec: &TransportSpec) -> Result<Box<dyn EmailTransport>, TransportError>;
}

/// Production connector: lettre for SMTP, reqwest for the HTTP API.
///
/// The reqwest client is shared so its connection pool survives across sends.
#[derive(Clone, Default)]
pub struct DefaultConnector {
    http: reqwest::Client,
}

impl DefaultConnector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransportConnector for DefaultConnector {
    fn connect(&self, spec: &TransportSpec) -> Result<Box<dyn EmailTransport>, TransportError> {
        match spec {
            TransportSpec::Smtp {
                server,
                port,
                username,
                password,
            } => Ok(Box::new(SmtpTransport::new(server, *port, username, password)?)),
            TransportSpec::HttpApi { url, api_key } => Ok(Box::new(HttpApiTransport::new(
                self.http.clone(),
                url.clone(),
                api_key.clone(),
            ))),
        }
    }
}
