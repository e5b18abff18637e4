pub mod auth;
pub mod health;
pub mod posts;
pub mod projects;
pub mod users;
pub mod volunteer;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full API surface with request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(users::router())
        .merge(posts::router())
        .merge(projects::router())
        .merge(volunteer::router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
