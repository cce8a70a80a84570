use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    /// Out-of-range scores, malformed dates or times. Recoverable by asking again.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Stored data exists but cannot be read or parsed.
    #[error("Data unavailable at {}: {reason}", path.display())]
    DataUnavailable { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl JournalError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        JournalError::InvalidInput(msg.into())
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, JournalError::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;
