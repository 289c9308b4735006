use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibrisError {
    /// The config file, an env override, or a value in it is unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LibrisError {
    /// Short error code string for logs and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            LibrisError::Config(_) => "CONFIG_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, LibrisError>;
