use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn schedule_routes(state: Arc<AppConfig>) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/{doctor_id}/weekly-schedule", get(handlers::get_weekly_template));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/{doctor_id}/weekly-schedule", post(handlers::save_weekly_template))
        .route("/{doctor_id}/weekly-schedule", delete(handlers::clear_weekly_template))
        .route("/{doctor_id}/exceptions", get(handlers::list_exceptions))
        .route("/{doctor_id}/exceptions", post(handlers::upsert_exception))
        .route("/{doctor_id}/exceptions/{exception_id}", delete(handlers::delete_exception))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
