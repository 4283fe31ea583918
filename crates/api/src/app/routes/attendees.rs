use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use eventhub_core::{EventId, UserId};

use crate::app::dto::Items;
use crate::app::errors::ApiError;
use crate::app::operations;
use crate::app::services::AppServices;
use crate::context::CurrentUser;

use super::parse_id;

fn parse_pair(event_id: &str, user_id: &str) -> Result<(EventId, UserId), ApiError> {
    Ok((parse_id(event_id)?, parse_id(user_id)?))
}

pub async fn list_for_event(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let event_id: EventId = parse_id(&id)?;
    let users = operations::list_attendees(&services, event_id).await?;
    Ok((StatusCode::OK, Json(Items::from(users))).into_response())
}

pub async fn events_for_attendee(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let user_id: UserId = parse_id(&id)?;
    let events = operations::list_events_of_attendee(&services, user_id).await?;
    Ok((StatusCode::OK, Json(Items::from(events))).into_response())
}

pub async fn add(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentUser(identity): CurrentUser,
    Path((event_id, user_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (event_id, user_id) = parse_pair(&event_id, &user_id)?;
    let attendee = operations::add_attendee(&services, identity.as_ref(), event_id, user_id).await?;
    Ok((StatusCode::CREATED, Json(attendee)).into_response())
}

pub async fn get(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentUser(identity): CurrentUser,
    Path((event_id, user_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (event_id, user_id) = parse_pair(&event_id, &user_id)?;
    let attendee = operations::get_attendee(&services, identity.as_ref(), event_id, user_id).await?;
    Ok((StatusCode::OK, Json(attendee)).into_response())
}

pub async fn remove(
    Extension(services): Extension<Arc<AppServices>>,
    CurrentUser(identity): CurrentUser,
    Path((event_id, user_id)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let (event_id, user_id) = parse_pair(&event_id, &user_id)?;
    operations::remove_attendee(&services, identity.as_ref(), event_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
