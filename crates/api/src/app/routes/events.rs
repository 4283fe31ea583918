use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use eventhub_core::{EventDetails, EventId, UserId};

use crate::app::dto::Items;
use crate::app::errors::ApiError;
use crate::app::extract::JsonBody;
use crate::app::operations;
use crate::app::services::AppServices;
use crate::context::CurrentUser;

use super::parse_id;

pub async fn list(Extension(services): Extension<Arc<AppServices>>) -> Result<Response, ApiError> {
    let events = operations::list_events(&services).await?;
    Ok((StatusCode::OK, Json(Items::from(events))).into_response())
}

pub async fn get(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: EventId = parse_id(&id)?;
    let event = operations::get_event(&services, id).await?;
    Ok((StatusCode::OK, Json(event)).into_response())
}

pub async fn list_for_owner(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let owner_id: UserId = parse_id(&id)?;
    let events = operations::list_events_of_owner(&services, owner_id).await?;
    Ok((StatusCode::OK, Json(Items::from(events))).into_response())
}

pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentUser(identity): CurrentUser,
    JsonBody(body): JsonBody<EventDetails>,
) -> Result<Response, ApiError> {
    let event = operations::create_event(&services, identity.as_ref(), body).await?;
    Ok((StatusCode::CREATED, Json(event)).into_response())
}

pub async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<EventDetails>,
) -> Result<Response, ApiError> {
    let id: EventId = parse_id(&id)?;
    let event = operations::update_event(&services, identity.as_ref(), id, body).await?;
    Ok((StatusCode::OK, Json(event)).into_response())
}

pub async fn delete(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentUser(identity): CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: EventId = parse_id(&id)?;
    operations::delete_event(&services, identity.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
