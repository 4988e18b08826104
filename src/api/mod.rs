//! HTTP/Auth surface (spec.md §4.8): the axum router, bearer-token
//! extractor and typed error responses, following the teacher's
//! `api/mod.rs` `create_app` + `ApiError`/`IntoResponse` pattern.

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::AuthUser;
pub use error::AppError;

use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::http::StatusCode;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;

async fn handle_timeout(_err: tower::BoxError) -> StatusCode {
    StatusCode::SERVICE_UNAVAILABLE
}

pub fn create_app(ctx: Arc<AppContext>) -> Router {
    let request_timeout = Duration::from_secs(ctx.settings.load().api.request_timeout_seconds);
    routes::build_router(ctx).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .layer(HandleErrorLayer::new(handle_timeout))
            .timeout(request_timeout),
    )
}
