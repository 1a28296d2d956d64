use marquee_core::upload::UploadRejection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Per-field messages, `{"field": ["message", ...]}`.
    #[error("some fields are invalid")]
    Validation(serde_json::Value),

    #[error(transparent)]
    Upload(#[from] UploadRejection),

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("please verify your email address before signing in")]
    EmailNotVerified,

    #[error("you are not signed in")]
    NotSignedIn,

    #[error("only administrators can do that")]
    NotAdmin,

    /// Non-success response from the backend.
    #[error("{message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Failures that should send the user back to the sign-in screen.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::InvalidCredentials | Self::EmailNotVerified | Self::NotSignedIn => true,
            Self::Service { status, .. } => *status == 401,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}
