use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;
use crate::volunteer::handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/volunteer-activities",
            get(handlers::list_activities).post(handlers::create_activity),
        )
        .route(
            "/api/volunteer-activities/{id}",
            put(handlers::update_activity).delete(handlers::delete_activity),
        )
        .route(
            "/api/volunteer-activities/{id}/join",
            post(handlers::join_activity),
        )
        .route(
            "/api/volunteer-activities/{id}/requests",
            get(handlers::list_requests),
        )
        .route(
            "/api/volunteer-activities/{id}/requests/{request_id}/approve",
            post(handlers::approve_request),
        )
        .route(
            "/api/volunteer-activities/{id}/requests/{request_id}/reject",
            post(handlers::reject_request),
        )
}
