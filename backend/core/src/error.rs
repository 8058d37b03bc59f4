use thiserror::Error;

/// Top-level error type for chatmem.
#[derive(Debug, Error)]
pub enum ChatMemError {
    #[error("completion gateway error ({provider}{}): {message}", fmt_status(.status))]
    Gateway {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("no response received from the completion gateway")]
    EmptyResponse,

    #[error("invalid chat import: {0}")]
    InvalidImport(String),

    #[error("invalid memory transcript: {0}")]
    InvalidTranscript(String),

    #[error("chat not found: {0}")]
    ChatNotFound(String),

    #[error("no current chat selected")]
    NoCurrentChat,

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChatMemError {
    pub fn gateway(provider: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        ChatMemError::Gateway {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(", status {s}")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, ChatMemError>;
