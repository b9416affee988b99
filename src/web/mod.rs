//! HTTP surface: axum router, handlers and error mapping.

mod handlers;
mod router;

pub use router::{AppState, build_router};

use crate::core::AppError;
use crate::reconcile::ReconcileError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum WebError {
    BadRequest { code: &'static str, message: String },
    Input { code: &'static str, message: String },
    NotFound { code: &'static str, message: String },
    Conflict(String),
    /// Detail is logged, never sent to the client.
    Internal(String),
}

impl From<ReconcileError> for WebError {
    fn from(err: ReconcileError) -> Self {
        let message = err.to_string();
        match err {
            ReconcileError::DuplicateChildIdentity(_) => Self::BadRequest {
                code: "duplicate_child_identity",
                message,
            },
            ReconcileError::MissingReference { .. } => Self::BadRequest {
                code: "missing_reference",
                message,
            },
            ReconcileError::InvalidPayload(_) => Self::Input {
                code: "invalid_payload",
                message,
            },
            ReconcileError::UnknownChildIdentity(_) => Self::NotFound {
                code: "unknown_child_identity",
                message,
            },
            ReconcileError::UnresolvedReference(_) => Self::NotFound {
                code: "unresolved_reference",
                message,
            },
            ReconcileError::AlreadyOwned { .. } | ReconcileError::ChildIdentityTaken(_) => {
                Self::Internal(message)
            }
        }
    }
}

impl From<AppError> for WebError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Reconcile(err) => Self::from(err),
            AppError::Validation(message) => Self::Input {
                code: "validation_error",
                message,
            },
            AppError::NotFound(message) => Self::NotFound {
                code: "not_found",
                message,
            },
            AppError::Conflict(message) => Self::Conflict(message),
            AppError::IoError(message) | AppError::Internal(message) => Self::Internal(message),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            WebError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, message, code),
            WebError::Input { code, message } => {
                (StatusCode::UNPROCESSABLE_ENTITY, message, code)
            }
            WebError::NotFound { code, message } => (StatusCode::NOT_FOUND, message, code),
            WebError::Conflict(message) => (StatusCode::CONFLICT, message, "conflict"),
            WebError::Internal(detail) => {
                error!(error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "unexpected server error".to_string(),
                    "internal_error",
                )
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: impl Into<WebError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn reconcile_errors_map_to_client_statuses() {
        assert_eq!(
            status_of(ReconcileError::DuplicateChildIdentity(5)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ReconcileError::UnknownChildIdentity(9)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ReconcileError::UnresolvedReference(30)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ReconcileError::InvalidPayload("reps".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn already_owned_hides_the_identity() {
        let err = WebError::from(AppError::from(ReconcileError::AlreadyOwned { child: Some(3) }));
        match &err {
            WebError::Internal(detail) => assert!(detail.contains('3')),
            other => panic!("expected internal error, got {other:?}"),
        }
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(ReconcileError::ChildIdentityTaken(4)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn app_errors_map_to_statuses() {
        assert_eq!(status_of(AppError::conflict("taken")), StatusCode::CONFLICT);
        assert_eq!(
            status_of(AppError::validation("blank")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(AppError::not_found("routine", 1)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::IoError("disk".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
