use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use booking_cell::router::booking_routes;
use schedule_cell::router::schedule_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    let doctor_routes = schedule_routes(state.clone()).merge(booking_routes(state.clone()));

    Router::new()
        .route("/", get(|| async { "Availability API is running!" }))
        .nest("/doctors", doctor_routes)
}
