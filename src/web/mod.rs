//! HTTP mapping for registry errors.
//!
//! Handlers return `Result<_, RegistryError>` and axum turns the error into a
//! status code plus a `{"error", "code"}` JSON body.

use crate::core::RegistryError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub fn status_of(err: &RegistryError) -> StatusCode {
    match err {
        RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
        RegistryError::InvalidInput(_) | RegistryError::TypeMismatch { .. } => {
            StatusCode::BAD_REQUEST
        }
        RegistryError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        RegistryError::TransactionAborted { .. } => StatusCode::CONFLICT,
        RegistryError::Storage(_) | RegistryError::Credential(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = status_of(&self);
        let message = match internal_cause(&self) {
            Some(RegistryError::Storage(_)) => {
                error!(error = %self, "storage failure");
                "database operation failed".to_string()
            }
            Some(_) => {
                error!(error = %self, "credential failure");
                "internal server error".to_string()
            }
            None => self.to_string(),
        };

        let body = Json(ErrorResponse {
            error: message,
            code: self.kind().to_string(),
        });

        (status, body).into_response()
    }
}

/// The storage or credential failure behind `err`, looking through an
/// aborted transaction. Their messages stay in the logs.
fn internal_cause(err: &RegistryError) -> Option<&RegistryError> {
    match err {
        RegistryError::Storage(_) | RegistryError::Credential(_) => Some(err),
        RegistryError::TransactionAborted { source, .. } => internal_cause(source),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value as JsonValue;

    async fn body_of(err: RegistryError) -> (StatusCode, JsonValue) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_aborted_storage_failure_is_not_leaked() {
        let err = RegistryError::aborted(
            Some(4),
            RegistryError::Storage(rusqlite::Error::InvalidColumnName("secret_col".into())),
        );
        let (status, body) = body_of(err).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "transaction_aborted");
        assert_eq!(body["error"], "database operation failed");
    }

    #[tokio::test]
    async fn test_aborted_client_failure_keeps_its_message() {
        let err = RegistryError::aborted(Some(50), RegistryError::not_found("Student with id 50 not found"));
        let (status, body) = body_of(err).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(
            body["error"],
            "Transaction aborted at record 50: Not found: Student with id 50 not found"
        );
    }

    #[test]
    fn test_status_per_kind() {
        assert_eq!(status_of(&RegistryError::not_found("x")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(&RegistryError::invalid_input("x")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(&RegistryError::TypeMismatch {
                field: "class".into(),
                expected: "TEXT",
                found: "INTEGER",
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(&RegistryError::unauthorized("x")), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(&RegistryError::aborted(Some(3), RegistryError::not_found("x"))),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(&RegistryError::Storage(rusqlite::Error::InvalidQuery)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
