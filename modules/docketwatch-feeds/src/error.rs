use std::time::Duration;

/// Result type alias for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Why a court feed could not be obtained. Courts go down, hang, and emit
/// broken XML routinely; every variant is worth retrying later.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Feed request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Feed transport failed: {0}")]
    Transport(String),

    #[error("Feed returned HTTP {0}")]
    Status(u16),

    #[error("Malformed feed payload: {0}")]
    Format(String),
}

impl FeedError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport(_) | Self::Status(_) | Self::Format(_) => true,
        }
    }

    /// True for payload problems, as opposed to network problems.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            // reqwest doesn't report which deadline fired
            Self::Timeout(Duration::ZERO)
        } else if let Some(status) = e.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
