use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::auth::jwt::TokenError;
use crate::users::store::StoreError;

/// Everything a handler can fail with. Expected conditions map to their
/// status codes with a generic body; `Internal` is logged server-side and
/// surfaces as a bare 500.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("email already registered")]
    EmailAlreadyExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error("forbidden field mutation")]
    ForbiddenFieldMutation,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

impl From<TokenError> for AppError {
    fn from(_: TokenError) -> Self {
        // Malformed, bad-signature and expired all look the same from
        // outside.
        Self::Unauthorized
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => Self::EmailAlreadyExists,
            StoreError::NotFound => Self::Unauthorized,
            StoreError::Other(e) => Self::Internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            Self::EmailAlreadyExists => {
                (StatusCode::CONFLICT, "Email already registered".to_string())
            }
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_string(),
            ),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Invalid or missing credentials".to_string(),
            ),
            Self::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::ForbiddenFieldMutation => (
                StatusCode::FORBIDDEN,
                "Profile update cannot modify protected fields".to_string(),
            ),
            Self::Internal(err) => {
                error!(error = %err, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_collapse_to_unauthorized() {
        for err in [
            TokenError::Malformed,
            TokenError::BadSignature,
            TokenError::Expired,
        ] {
            assert!(matches!(AppError::from(err), AppError::Unauthorized));
        }
    }

    #[test]
    fn duplicate_email_maps_to_conflict() {
        let err = AppError::from(StoreError::DuplicateEmail);
        assert!(matches!(err, AppError::EmailAlreadyExists));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            AppError::InvalidCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Validation("bad".into()).into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::ForbiddenFieldMutation.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
