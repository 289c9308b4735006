//! Shared configuration, error and message types for the Libris workspace.

pub mod config;
pub mod error;
pub mod types;

pub use config::LibrisConfig;
pub use error::{LibrisError, Result};
pub use types::{MessageId, OutboundMessage};
