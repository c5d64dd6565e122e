use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// A single failed field check, reported alongside any other failing fields.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// One or more request fields failed validation. All failures are
    /// collected before returning, not just the first.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// Credential check failed. Deliberately opaque: the same message covers
    /// unknown email and wrong password so accounts cannot be enumerated.
    #[error("Unable to authenticate with provided credentials")]
    Unauthorized,

    #[error("Email already registered")]
    EmailTaken,

    #[error("User not found")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            ApiError::EmailTaken => (
                StatusCode::CONFLICT,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_serialize_with_field_and_message() {
        let errors = vec![
            FieldError::new("email", "must be a valid email address"),
            FieldError::new("password", "must be at least 5 characters"),
        ];
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json[0]["field"], "email");
        assert_eq!(json[1]["field"], "password");
        assert_eq!(json[1]["message"], "must be at least 5 characters");
    }

    #[test]
    fn unauthorized_message_is_fixed() {
        assert_eq!(
            ApiError::Unauthorized.to_string(),
            "Unable to authenticate with provided credentials"
        );
    }
}
