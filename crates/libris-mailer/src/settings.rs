//! Email credentials: environment first, `email_config.json` as fallback.
//!
//! Nothing here is cached. [`EmailConfigSource::resolve`] is called once per
//! send, so rotated credentials take effect on the next message.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SendError;
use crate::transport::TransportSpec;

pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_LIBRARY_NAME: &str = "AOA Library";
pub const DEFAULT_API_URL: &str = "https://api.resend.com/emails";

/// Settings for one send. Field names match the keys of `email_config.json`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_server: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub email_password: Option<String>,
    #[serde(default = "default_library_name")]
    pub library_name: String,
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}
fn default_library_name() -> String {
    DEFAULT_LIBRARY_NAME.to_string()
}

// Secrets never reach the logs.
impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("enabled", &self.enabled)
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("email_address", &self.email_address)
            .field("email_password", &self.email_password.as_ref().map(|_| "<redacted>"))
            .field("library_name", &self.library_name)
            .finish()
    }
}

impl EmailConfig {
    /// Sender identity, if set and non-blank.
    pub fn sender(&self) -> Option<&str> {
        non_blank(self.email_address.as_deref())
    }

    /// Pick the transport: an API key selects the HTTP API, otherwise SMTP.
    pub fn transport_spec(&self) -> Result<TransportSpec, SendError> {
        if let Some(api_key) = non_blank(self.api_key.as_deref()) {
            let url = non_blank(self.api_url.as_deref()).unwrap_or(DEFAULT_API_URL);
            return Ok(TransportSpec::HttpApi {
                url: url.to_string(),
                api_key: api_key.to_string(),
            });
        }

        let username = self.sender().ok_or(SendError::MissingSender)?;
        let password = non_blank(self.email_password.as_deref())
            .ok_or(SendError::IncompleteCredentials("email_password"))?;
        let server = non_blank(self.smtp_server.as_deref())
            .ok_or(SendError::IncompleteCredentials("smtp_server"))?;

        Ok(TransportSpec::Smtp {
            server: server.to_string(),
            port: self.smtp_port,
            username: username.to_string(),
            // App passwords are often pasted with spaces.
            password: password.chars().filter(|c| *c != ' ').collect(),
        })
    }

    /// Non-secret summary for the admin status endpoint.
    pub fn status(&self, origin: &ConfigOrigin) -> EmailStatus {
        EmailStatus {
            configured: true,
            source: Some(origin.to_string()),
            enabled: self.enabled,
            transport: self.transport_spec().ok().map(|spec| spec.kind()),
            sender: self.sender().map(str::to_string),
            has_password: non_blank(self.email_password.as_deref()).is_some(),
            has_api_key: non_blank(self.api_key.as_deref()).is_some(),
            smtp_server: non_blank(self.smtp_server.as_deref()).map(str::to_string),
            smtp_port: self.smtp_port,
            library_name: self.library_name.clone(),
        }
    }
}

/// What `GET /admin/email-status` reports.
#[derive(Debug, Clone, Serialize)]
pub struct EmailStatus {
    pub configured: bool,
    pub source: Option<String>,
    pub enabled: bool,
    pub transport: Option<&'static str>,
    pub sender: Option<String>,
    pub has_password: bool,
    pub has_api_key: bool,
    pub smtp_server: Option<String>,
    pub smtp_port: u16,
    pub library_name: String,
}

impl EmailStatus {
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            source: None,
            enabled: false,
            transport: None,
            sender: None,
            has_password: false,
            has_api_key: false,
            smtp_server: None,
            smtp_port: DEFAULT_SMTP_PORT,
            library_name: DEFAULT_LIBRARY_NAME.to_string(),
        }
    }
}

/// Where a resolved config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    Environment,
    File(PathBuf),
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::Environment => write!(f, "environment"),
            ConfigOrigin::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: EmailConfig,
    pub origin: ConfigOrigin,
}

/// Supplies email settings on demand.
pub trait EmailConfigSource: Send + Sync {
    /// Resolve the current settings, or `None` when nothing usable exists.
    fn resolve(&self) -> Option<ResolvedConfig>;
}

/// The production source: process environment, then a JSON file.
#[derive(Debug, Clone)]
pub struct EnvFileSource {
    file: PathBuf,
}

impl EnvFileSource {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }
}

impl EmailConfigSource for EnvFileSource {
    fn resolve(&self) -> Option<ResolvedConfig> {
        resolve_with(|key| std::env::var(key).ok(), &self.file)
    }
}

/// A fixed config, for tests and one-off tools.
#[derive(Debug, Clone)]
pub struct StaticSource(pub Option<EmailConfig>);

impl EmailConfigSource for StaticSource {
    fn resolve(&self) -> Option<ResolvedConfig> {
        self.0.clone().map(|config| ResolvedConfig {
            config,
            origin: ConfigOrigin::Environment,
        })
    }
}

/// Load settings from the process environment or `file`.
pub fn load_email_config(file: &Path) -> Option<EmailConfig> {
    resolve_with(|key| std::env::var(key).ok(), file).map(|r| r.config)
}

/// Resolve settings using `env` for variable lookup.
///
/// `SMTP_SERVER` or `EMAIL_API_KEY` being set selects the environment;
/// otherwise `file` is read. A missing or malformed file yields `None`.
pub fn resolve_with<F>(env: F, file: &Path) -> Option<ResolvedConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    if var("SMTP_SERVER").is_some() || var("EMAIL_API_KEY").is_some() {
        let smtp_port = match var("SMTP_PORT") {
            Some(raw) => match raw.trim().parse::<u16>() {
                Ok(port) => port,
                Err(e) => {
                    warn!(value = %raw, error = %e, "SMTP_PORT is not a valid port");
                    return None;
                }
            },
            None => DEFAULT_SMTP_PORT,
        };
        let config = EmailConfig {
            enabled: var("EMAIL_ENABLED")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(true),
            smtp_server: var("SMTP_SERVER"),
            smtp_port,
            api_url: var("EMAIL_API_URL"),
            api_key: var("EMAIL_API_KEY"),
            email_address: var("EMAIL_ADDRESS"),
            email_password: var("EMAIL_PASSWORD"),
            library_name: var("LIBRARY_NAME").unwrap_or_else(default_library_name),
        };
        return Some(ResolvedConfig {
            config,
            origin: ConfigOrigin::Environment,
        });
    }

    let raw = match std::fs::read_to_string(file) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %file.display(), "no email config in env and no config file");
            return None;
        }
        Err(e) => {
            warn!(path = %file.display(), error = %e, "failed to read email config file");
            return None;
        }
    };

    match serde_json::from_str::<EmailConfig>(&raw) {
        Ok(config) => Some(ResolvedConfig {
            config,
            origin: ConfigOrigin::File(file.to_path_buf()),
        }),
        Err(e) => {
            warn!(path = %file.display(), error = %e, "email config file is not valid JSON");
            None
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
