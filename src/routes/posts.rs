use axum::routing::{get, post};
use axum::Router;

use crate::engagement::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route("/api/posts/{id}/like", post(handlers::like_post))
        .route(
            "/api/posts/{id}/comments",
            get(handlers::list_comments).post(handlers::add_comment),
        )
        .route(
            "/api/posts/{id}/comments/{comment_id}/like",
            post(handlers::like_comment),
        )
}
