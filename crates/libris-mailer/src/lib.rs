//! `libris-mailer` — outbound email for the library reminder service.
//!
//! # Overview
//!
//! | Piece          | Role                                                        |
//! |----------------|-------------------------------------------------------------|
//! | [`settings`]   | Credentials from env or `email_config.json`, reloaded per send |
//! | [`address`]    | Recipient sanitation (header-injection guard)               |
//! | [`transport`]  | Pluggable delivery: SMTP ([`smtp`]) or HTTP API ([`http_api`]) |
//! | [`sender`]     | [`Mailer`]: the synchronous `send_now` path                 |
//! | [`queue`]      | [`MailQueue`]: unbounded FIFO shared by request handlers    |
//! | [`worker`]     | [`MailWorker`]: the single background consumer of the queue |
//! | [`templates`]  | HTML bodies for reminders and confirmations                 |

pub mod address;
pub mod error;
pub mod http_api;
pub mod queue;
pub mod sender;
pub mod settings;
pub mod smtp;
pub mod templates;
pub mod transport;
pub mod worker;

pub use address::sanitize_address;
pub use error::{SendError, TransportError};
pub use queue::MailQueue;
pub use sender::Mailer;
pub use settings::{
    ConfigOrigin, EmailConfig, EmailConfigSource, EmailStatus, EnvFileSource, ResolvedConfig,
    StaticSource,
};
pub use transport::{DefaultConnector, EmailTransport, Envelope, TransportConnector, TransportSpec};
pub use worker::MailWorker;
