use std::sync::Arc;

use axum::{Extension, Json, http::StatusCode, response::IntoResponse, response::Response};
use chrono::Utc;

use eventhub_core::Registration;

use crate::app::dto::LoginRequest;
use crate::app::errors::ApiError;
use crate::app::extract::JsonBody;
use crate::app::operations;
use crate::app::services::AppServices;

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<Registration>,
) -> Result<Response, ApiError> {
    let user = operations::register(&services, body).await?;
    Ok((StatusCode::CREATED, Json(user)).into_response())
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Response, ApiError> {
    let token = operations::login(&services, body, Utc::now()).await?;
    Ok((StatusCode::OK, Json(token)).into_response())
}
