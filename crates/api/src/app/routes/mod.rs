use std::str::FromStr;

use axum::{
    Router,
    routing::{MethodRouter, get, post, put},
};

use eventhub_core::DomainError;

use super::errors::ApiError;
use crate::middleware::{AuthState, auth_middleware};

pub mod attendees;
pub mod auth;
pub mod events;
pub mod system;

/// Endpoints that work without credentials.
pub fn public_router() -> Router {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/events", get(events::list))
        .route("/events/:id", get(events::get))
        .route("/events/:id/attendees", get(attendees::list_for_event))
        .route("/attendees/:id/events", get(attendees::events_for_attendee))
        .route("/users/:id/events", get(events::list_for_owner))
}

/// Endpoints behind the auth middleware.
///
/// Authentication is a per-method `route_layer`: an unsupported method on a
/// path shared with the public router is a 405, not a 401.
pub fn protected_router(auth: AuthState) -> Router {
    let authenticated = |route: MethodRouter| {
        route.route_layer(axum::middleware::from_fn_with_state(auth.clone(), auth_middleware))
    };

    Router::new()
        .route("/whoami", authenticated(get(system::whoami)))
        .route("/events", authenticated(post(events::create)))
        .route(
            "/events/:id",
            authenticated(put(events::update).delete(events::delete)),
        )
        .route(
            "/events/:id/attendees/:user_id",
            authenticated(post(attendees::add).get(attendees::get).delete(attendees::remove)),
        )
}

/// Path ids must be positive integers.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse::<T>().map_err(ApiError::from)
}
