use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by the CRM REST client
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// `success: false` envelope; carries the backend's `message` verbatim.
    #[error("{0}")]
    Validation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unexpected response shape: {0}")]
    Shape(String),
}

impl ApiError {
    pub fn validation<T: std::fmt::Display>(msg: T) -> Self {
        ApiError::Validation(msg.to_string())
    }

    pub fn shape<T: std::fmt::Display>(msg: T) -> Self {
        ApiError::Shape(msg.to_string())
    }

    /// True for transport failures and server-side (5xx) statuses.
    pub fn is_network(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Status { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
