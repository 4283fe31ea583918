use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use eventhub_auth::{AuthzError, PasswordError, TokenError};
use eventhub_core::DomainError;
use eventhub_infra::StoreError;

/// Error taxonomy of the HTTP surface.
///
/// Lower layers convert into this via `From`; every variant renders as
/// `{ "error": <code>, "message": <text> }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing bearer credentials")]
    MissingCredentials,

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    ConstraintViolation(String),

    #[error("store timeout: {0}")]
    StoreTimeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ConstraintViolation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCredentials | ApiError::Unauthorized | ApiError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::ConstraintViolation(_) => StatusCode::CONFLICT,
            ApiError::StoreTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingCredentials => "missing_credentials",
            ApiError::Unauthorized => "unauthorized",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Validation(_) => "validation_error",
            ApiError::ConstraintViolation(_) => "conflict",
            ApiError::StoreTimeout(_) => "unavailable",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        match self {
            ApiError::StoreTimeout(detail) => {
                tracing::error!(%detail, "request failed: store timeout");
                json_error(status, code, "service temporarily unavailable")
            }
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "request failed: internal error");
                json_error(status, code, "internal server error")
            }
            other => json_error(status, code, other.to_string()),
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity } => ApiError::NotFound(entity),
            StoreError::ConstraintViolation(detail) => {
                tracing::debug!(%detail, "store rejected write");
                ApiError::conflict("request conflicts with existing data")
            }
            err @ StoreError::Timeout { .. } => ApiError::StoreTimeout(err.to_string()),
            StoreError::Internal(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => ApiError::Validation(msg),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Invalid | TokenError::Expired => ApiError::Unauthorized,
            TokenError::Signing(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("blocking task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn store_errors_map_to_http_taxonomy() {
        assert_eq!(ApiError::from(StoreError::not_found("event")).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(StoreError::constraint("duplicate key")).status(),
            StatusCode::CONFLICT
        );
        let timeout = StoreError::Timeout {
            operation: "find_event",
            deadline: Duration::from_secs(3),
        };
        assert_eq!(ApiError::from(timeout).code(), "unavailable");
        assert_eq!(
            ApiError::from(StoreError::internal("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn constraint_detail_is_not_exposed() {
        let err = ApiError::from(StoreError::constraint("attendees_event_id_user_id_key"));
        assert!(!err.to_string().contains("attendees_event_id_user_id_key"));
    }

    #[test]
    fn token_errors_are_unauthorized() {
        assert_eq!(ApiError::from(TokenError::Expired).code(), "unauthorized");
        assert_eq!(ApiError::from(TokenError::Invalid).code(), "unauthorized");
        assert_eq!(ApiError::MissingCredentials.code(), "missing_credentials");
    }

    async fn body_json(res: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn internal_response_hides_detail() {
        let res = ApiError::internal("connection reset by peer").into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(res).await;
        assert_eq!(body["error"], "internal_error");
        assert_eq!(body["message"], "internal server error");
        assert!(!body.to_string().contains("connection reset by peer"));
    }

    #[tokio::test]
    async fn timeout_response_hides_detail() {
        let err = ApiError::from(StoreError::Timeout {
            operation: "list_attendees_by_event",
            deadline: Duration::from_secs(3),
        });
        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(res).await;
        assert_eq!(body["error"], "unavailable");
        assert!(!body.to_string().contains("list_attendees_by_event"));
    }
}
