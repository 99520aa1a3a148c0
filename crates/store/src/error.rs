use crm_rust_api::{ApiError, ResourceKind};
use thiserror::Error;

/// Failures of a store action. Every variant except [`StoreError::Superseded`]
/// is also recorded as the store's `error` message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("A company id is required for this action")]
    MissingScope,

    #[error("{kind} {id} is not in the current list")]
    NotFound { kind: ResourceKind, id: String },

    #[error("Only {found} of the {requested} selected {kind}s are loaded; refresh and try again")]
    CountMismatch {
        kind: ResourceKind,
        requested: usize,
        found: usize,
    },

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    Validation(String),

    #[error("Response discarded after navigation")]
    Superseded,
}

impl From<ApiError> for StoreError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Validation(message) => StoreError::Validation(message),
            ApiError::Status { status, message } if status.is_client_error() => {
                StoreError::Validation(message)
            }
            other => StoreError::Network(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crm_rust_api::StatusCode;

    #[test]
    fn client_errors_are_validation() {
        let err: StoreError = ApiError::Status {
            status: StatusCode::BAD_REQUEST,
            message: "Invalid lead ID format".to_string(),
        }
        .into();
        assert_eq!(err, StoreError::Validation("Invalid lead ID format".to_string()));
    }

    #[test]
    fn server_errors_are_network() {
        let err: StoreError = ApiError::Status {
            status: StatusCode::BAD_GATEWAY,
            message: "upstream down".to_string(),
        }
        .into();
        assert!(matches!(err, StoreError::Network(ref m) if m.contains("502")));
    }

    #[test]
    fn messages_are_displayable() {
        let err = StoreError::CountMismatch {
            kind: ResourceKind::Lead,
            requested: 3,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "Only 2 of the 3 selected leads are loaded; refresh and try again"
        );
    }
}
