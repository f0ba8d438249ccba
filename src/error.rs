use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitHubProfileError {
    #[error("GitHub API error: {0}")]
    ApiError(String),

    #[error("GraphQL error: {0}")]
    GraphQlError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Mutation already in flight: {0}")]
    MutationInFlight(String),

    #[error("Action unavailable: {0}")]
    ActionUnavailable(String),
}

pub type Result<T> = std::result::Result<T, GitHubProfileError>;
