use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::context::AppContext;

use super::handlers;

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/auth/me", get(handlers::me))
        .route("/auth/change-password", post(handlers::change_password))
        .route("/auth/users", get(handlers::list_users).post(handlers::create_user))
        .route("/auth/users/:username", axum::routing::delete(handlers::disable_user))
        .route("/webhook/camera-event", post(handlers::webhook_camera_event))
        .route("/incidents", get(handlers::list_incidents))
        .route("/incidents/:id", get(handlers::get_incident))
        .route("/incidents/:id/decision", post(handlers::record_decision))
        .route("/incidents/:id/approve", post(handlers::approve_incident))
        .route("/stream/incidents", get(handlers::stream_incidents))
        .route("/reports/shift", post(handlers::shift_report))
        .route("/settings", get(handlers::get_settings).put(handlers::put_settings))
        .route("/sim/start", post(handlers::sim_start))
        .route("/sim/stop", post(handlers::sim_stop))
        .route("/sim/replay", post(handlers::sim_replay))
        .route("/sim/status", get(handlers::sim_status))
        .with_state(ctx)
}
