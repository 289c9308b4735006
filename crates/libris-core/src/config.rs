use chrono::FixedOffset;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{LibrisError, Result};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_CONFIG_PATH: &str = "libris.toml";
pub const DEFAULT_EMAIL_CONFIG_FILE: &str = "email_config.json";
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 30;
pub const WORKER_POLL_INTERVAL_MS: u64 = 1_000;
pub const WORKER_HEARTBEAT_SECS: u64 = 30;
/// 18:00 East Africa Time.
pub const DEFAULT_REMINDER_HOUR: u8 = 18;
pub const DEFAULT_REMINDER_MINUTE: u8 = 0;
pub const DEFAULT_UTC_OFFSET: &str = "+03:00";
pub const SCHEDULER_POLL_SECS: u64 = 60;

/// Top-level config (libris.toml + LIBRIS_* env overrides).
///
/// Nested keys are addressed with a double underscore in the environment,
/// e.g. `LIBRIS_REMINDERS__HOUR=7` or `LIBRIS_EMAIL__SEND_TIMEOUT_SECS=10`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LibrisConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub email: EmailSettings,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub reminders: RemindersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            auth: AuthConfig::default(),
        }
    }
}

/// Guards the `/admin/*` routes. The CRUD application sits in front of the
/// gateway, so the default is no auth.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    Token,
    #[default]
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the lending ledger (the CRUD application's SQLite file).
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Process-level email settings. Credentials are NOT stored here: they are
/// re-read from the environment or `config_file` on every send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    #[serde(default = "default_email_config_file")]
    pub config_file: String,
    /// Upper bound on a single transport call.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            config_file: default_email_config_file(),
            send_timeout_secs: DEFAULT_SEND_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// How long one dequeue attempt waits before looping.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: WORKER_POLL_INTERVAL_MS,
            heartbeat_secs: WORKER_HEARTBEAT_SECS,
        }
    }
}

/// How reminder notifications reach the transport.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Send each reminder synchronously while scanning.
    #[default]
    Direct,
    /// Push reminders onto the delivery queue in scan order.
    Queued,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemindersConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_hour")]
    pub hour: u8,
    #[serde(default = "default_minute")]
    pub minute: u8,
    /// Fixed offset of the trigger timezone, `+HH:MM` / `-HH:MM`.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
    #[serde(default = "default_scheduler_poll_secs")]
    pub poll_secs: u64,
    #[serde(default)]
    pub delivery: DeliveryMode,
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: DEFAULT_REMINDER_HOUR,
            minute: DEFAULT_REMINDER_MINUTE,
            utc_offset: DEFAULT_UTC_OFFSET.to_string(),
            poll_secs: SCHEDULER_POLL_SECS,
            delivery: DeliveryMode::Direct,
        }
    }
}

impl RemindersConfig {
    /// Parse `utc_offset` into a chrono offset.
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset)
    }
}

/// Parse `+HH:MM`, `-HH:MM` or `Z` into a [`FixedOffset`].
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| LibrisError::Config("invalid utc offset".into()));
    }

    let invalid = || LibrisError::Config(format!("invalid utc offset: {raw:?}"));
    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1, &raw[1..]),
        Some(b'-') => (-1, &raw[1..]),
        _ => return Err(invalid()),
    };
    let (hh, mm) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hh.parse().map_err(|_| invalid())?;
    let minutes: i32 = mm.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_db_path() -> String {
    "library.db".to_string()
}
fn default_email_config_file() -> String {
    DEFAULT_EMAIL_CONFIG_FILE.to_string()
}
fn default_send_timeout_secs() -> u64 {
    DEFAULT_SEND_TIMEOUT_SECS
}
fn default_poll_interval_ms() -> u64 {
    WORKER_POLL_INTERVAL_MS
}
fn default_heartbeat_secs() -> u64 {
    WORKER_HEARTBEAT_SECS
}
fn default_hour() -> u8 {
    DEFAULT_REMINDER_HOUR
}
fn default_minute() -> u8 {
    DEFAULT_REMINDER_MINUTE
}
fn default_utc_offset() -> String {
    DEFAULT_UTC_OFFSET.to_string()
}
fn default_scheduler_poll_secs() -> u64 {
    SCHEDULER_POLL_SECS
}
fn bool_true() -> bool {
    true
}

impl LibrisConfig {
    /// Load config from a TOML file with LIBRIS_* env var overrides.
    ///
    /// A missing file is not an error; every section has defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);

        let config: LibrisConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("LIBRIS_").split("__"))
            .extract()
            .map_err(|e| LibrisError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.reminders.hour > 23 || self.reminders.minute > 59 {
            return Err(LibrisError::Config(format!(
                "reminder time {:02}:{:02} is not a valid time of day",
                self.reminders.hour, self.reminders.minute
            )));
        }
        self.reminders.offset()?;
        if self.gateway.auth.mode == AuthMode::Token && self.gateway.auth.token.is_none() {
            return Err(LibrisError::Config(
                "gateway.auth.mode = token requires gateway.auth.token".into(),
            ));
        }
        Ok(())
    }
}
