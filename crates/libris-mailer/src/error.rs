use thiserror::Error;

/// Failures raised by a concrete transport (SMTP relay, HTTP email API).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport could not be built from the supplied settings.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The provider rejected the credentials.
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// The provider could not be reached.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The provider answered but refused the message.
    #[error("Rejected by provider (status {status}): {body}")]
    Rejected { status: u16, body: String },

    /// Any other delivery failure.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The transport call exceeded `email.send_timeout_secs`.
    #[error("Operation timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Why a single send did not happen. Every variant is terminal for that
/// message: nothing is retried.
#[derive(Debug, Error)]
pub enum SendError {
    /// Neither the environment nor the config file supplied settings.
    #[error("email configuration not found (check env or email_config.json)")]
    ConfigMissing,

    /// `enabled` is false.
    #[error("email sending is disabled in config")]
    Disabled,

    /// `email_address` is not set.
    #[error("sender address (email_address) is not set in config")]
    MissingSender,

    /// Transport settings are present but incomplete.
    #[error("{0} is not set in config")]
    IncompleteCredentials(&'static str),

    /// The recipient failed sanitation.
    #[error("invalid or dangerous recipient address")]
    InvalidRecipient,

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl SendError {
    /// Stable code for logs and HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            SendError::ConfigMissing => "CONFIG_MISSING",
            SendError::Disabled => "EMAIL_DISABLED",
            SendError::MissingSender => "MISSING_SENDER",
            SendError::IncompleteCredentials(_) => "INCOMPLETE_CREDENTIALS",
            SendError::InvalidRecipient => "INVALID_RECIPIENT",
            SendError::Transport(_) => "TRANSPORT_FAILURE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errors = [
            SendError::ConfigMissing,
            SendError::Disabled,
            SendError::MissingSender,
            SendError::IncompleteCredentials("smtp_server"),
            SendError::InvalidRecipient,
            SendError::Transport(TransportError::Timeout { secs: 30 }),
        ];
        let mut codes: Vec<&str> = errors.iter().map(SendError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn transport_error_display_keeps_cause() {
        let err = SendError::from(TransportError::Rejected {
            status: 422,
            body: "invalid from".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "transport failure: Rejected by provider (status 422): invalid from"
        );
    }
}
