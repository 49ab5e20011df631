use axum::http::StatusCode;
use tracing::error;

use crate::storage::StorageError;

/// Outcome taxonomy shared by the domain services.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

/// Maps a service failure onto the `(status, message)` rejection handlers return.
/// Storage failures are logged here and surfaced generically.
pub fn reject(e: ServiceError) -> (StatusCode, String) {
    match e {
        ServiceError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        ServiceError::Storage(e) => {
            error!(error = %e, "persistence failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error interno del servidor".into(),
            )
        }
    }
}
