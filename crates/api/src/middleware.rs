use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use eventhub_auth::TokenService;
use eventhub_infra::{QueryDeadline, UserStore};

use crate::app::errors::ApiError;
use crate::context::RequestIdentity;

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<dyn TokenService>,
    pub users: Arc<dyn UserStore>,
    pub deadline: QueryDeadline,
}

/// Resolve the bearer token to a stored user and attach it as
/// [`RequestIdentity`].
///
/// A request without usable credentials is rejected before any store access.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;

    let user_id = state.tokens.validate(token, Utc::now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        ApiError::Unauthorized
    })?;

    let user = state.users.find_user(state.deadline, user_id).await?.ok_or_else(|| {
        tracing::warn!(%user_id, "token subject no longer exists");
        ApiError::Unauthorized
    })?;

    req.extensions_mut().insert(RequestIdentity::new(user));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(ApiError::MissingCredentials)?;

    let header = header.to_str().map_err(|_| ApiError::MissingCredentials)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::MissingCredentials)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(ApiError::MissingCredentials);
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderValue, header::AUTHORIZATION};

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_token_is_extracted() {
        let h = headers("Bearer abc.def.ghi");
        assert_eq!(extract_bearer(&h).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn missing_or_malformed_header_is_missing_credentials() {
        assert!(matches!(extract_bearer(&HeaderMap::new()), Err(ApiError::MissingCredentials)));
        assert!(matches!(extract_bearer(&headers("Basic Zm9vOmJhcg==")), Err(ApiError::MissingCredentials)));
        assert!(matches!(extract_bearer(&headers("Bearer   ")), Err(ApiError::MissingCredentials)));
    }
}
