use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde_json::json;

use crate::app::errors::ApiError;
use crate::app::operations;
use crate::context::CurrentUser;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

pub async fn whoami(CurrentUser(identity): CurrentUser) -> Result<Response, ApiError> {
    let user = operations::whoami(identity.as_ref())?;
    Ok((StatusCode::OK, Json(user)).into_response())
}
