//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/token/password wiring
//! - `operations.rs`: request operations, independent of axum
//! - `routes/`: HTTP handlers (one file per area)
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: error taxonomy and consistent error responses
//! - `extract.rs`: JSON body extractor that rejects with `ApiError`

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod operations;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: AppServices) -> Router {
    // Protected routes: require a resolved identity.
    let protected = routes::protected_router(services.auth_state());

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/v1", routes::public_router().merge(protected))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(Extension(Arc::new(services))),
        )
}
