use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected by the API with zero remaining quota. Recovered by backoff.
    #[error("GitHub API rate limited (HTTP {status})")]
    RateLimited {
        status: u16,
        /// Raw `x-ratelimit-reset` header value, if any.
        reset: Option<String>,
    },

    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<octocrab::Error> for AppError {
    fn from(e: octocrab::Error) -> Self {
        AppError::GitHubApi(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
