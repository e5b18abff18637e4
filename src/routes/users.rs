use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;
use crate::users::handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users/profile", post(handlers::update_profile))
        .route("/api/users/{id}", get(handlers::get_user))
}
