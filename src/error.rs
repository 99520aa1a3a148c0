//! Error handling for the CRM client

use crm_rust_api::ApiError;
use crm_rust_store::StoreError;
use std::fmt;
use thiserror::Error;

/// Unified error type for the CRM client
#[derive(Error, Debug)]
pub enum Error {
    /// Errors returned by the API layer
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Errors raised by a resource store action
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Errors building the HTTP client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Whether the failure came from the transport rather than the server's answer.
    pub fn is_network(&self) -> bool {
        match self {
            Error::Api(err) => err.is_network(),
            Error::Store(StoreError::Network(_)) | Error::Http(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
