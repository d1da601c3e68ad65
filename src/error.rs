use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Every failure the service can hand back to the HTTP layer. Each variant
/// maps to a stable (status, code, message) triple so the routing layer
/// needs no knowledge of internal error semantics.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("New password must be 6-128 characters with at least one letter and one number")]
    WeakPassword,
    #[error("Invalid result")]
    InvalidResult,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Access token required")]
    NoToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Invalid token")]
    TokenInvalid,
    #[error("Forbidden")]
    Forbidden,
    #[error("Creator permission required")]
    InsufficientPermissions,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Email already exists")]
    DuplicateEmail,
    #[error("Username already exists")]
    DuplicateUsername,
    #[error("Quiz has expired")]
    Expired,
    #[error("database error")]
    Storage(#[from] sqlx::Error),
    #[error("password hashing error")]
    Hashing,
    #[error("server configuration error: {0}")]
    Config(&'static str),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::WeakPassword => "WEAK_PASSWORD",
            ApiError::InvalidResult => "INVALID_RESULT",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::NoToken => "NO_TOKEN",
            ApiError::TokenExpired => "TOKEN_EXPIRED",
            ApiError::TokenInvalid => "INVALID_TOKEN",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::DuplicateEmail => "DUPLICATE_EMAIL",
            ApiError::DuplicateUsername => "DUPLICATE_USERNAME",
            ApiError::Expired => "EXPIRED",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::Hashing => "HASHING_ERROR",
            ApiError::Config(_) => "CONFIG_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::WeakPassword | ApiError::InvalidResult => {
                StatusCode::BAD_REQUEST
            }
            ApiError::InvalidCredentials
            | ApiError::NoToken
            | ApiError::TokenExpired
            | ApiError::TokenInvalid => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden | ApiError::InsufficientPermissions => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::DuplicateEmail | ApiError::DuplicateUsername => StatusCode::CONFLICT,
            ApiError::Expired => StatusCode::GONE,
            ApiError::Storage(_) | ApiError::Hashing | ApiError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Collaborator failures are logged with detail but answered with a
        // generic message; nothing credential-shaped reaches the client.
        let message = match &self {
            ApiError::Storage(e) => {
                error!(error = %e, "storage failure");
                "Internal server error".to_string()
            }
            ApiError::Hashing => {
                error!("password hashing failure");
                "Internal server error".to_string()
            }
            ApiError::Config(what) => {
                error!(what, "server misconfiguration");
                "Server configuration error".to_string()
            }
            other => other.to_string(),
        };

        let body = match &self {
            ApiError::Validation { field, .. } => {
                json!({ "error": message, "code": self.code(), "field": field })
            }
            _ => json!({ "error": message, "code": self.code() }),
        };

        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_kinds() {
        assert_eq!(
            ApiError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::InsufficientPermissions.status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::NotFound("Quiz").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::DuplicateEmail.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Expired.status(), StatusCode::GONE);
        assert_eq!(
            ApiError::Validation {
                field: "email",
                message: "Invalid email format".into()
            }
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Config("JWT_SECRET is not set").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ApiError::NoToken.code(), "NO_TOKEN");
        assert_eq!(ApiError::TokenExpired.code(), "TOKEN_EXPIRED");
        assert_eq!(ApiError::TokenInvalid.code(), "INVALID_TOKEN");
        assert_eq!(ApiError::DuplicateUsername.code(), "DUPLICATE_USERNAME");
        assert_eq!(
            ApiError::InsufficientPermissions.code(),
            "INSUFFICIENT_PERMISSIONS"
        );
    }

    #[test]
    fn internal_errors_do_not_leak_detail() {
        let response = ApiError::Storage(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
