use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::engagement::domain::{
    LikeTarget, NewComment, NewPost, PageRequest, Pagination, DEFAULT_AUTHOR_ID,
    UNKNOWN_COMMENT_AUTHOR, UNKNOWN_POST_AUTHOR,
};
use crate::error::{AppError, AppResult};
use crate::extractors::ApiJson;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListPostsQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub content: Option<String>,
    pub title: Option<String>,
    pub author_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct LikeRequest {
    pub user_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateCommentRequest {
    pub content: Option<String>,
    pub author_id: Option<i64>,
}

fn required_content(content: Option<String>) -> AppResult<String> {
    content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("content is required".into()))
}

/// Display name for `author_id`, or `fallback` when no such user exists.
async fn author_name(state: &AppState, author_id: i64, fallback: &str) -> AppResult<String> {
    let name = state
        .users
        .find_by_id(author_id)
        .await?
        .map(|u| u.display_name())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| fallback.to_string());
    Ok(name)
}

/// GET /api/posts
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> AppResult<Response> {
    let page = PageRequest::new(query.page, query.per_page);
    let posts = state.engagement.list_posts(page).await?;
    let total = state.engagement.count_posts().await?;

    Ok(Json(json!({
        "posts": posts,
        "total": total,
        "pagination": Pagination::new(page, total),
    }))
    .into_response())
}

/// POST /api/posts
pub async fn create_post(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> AppResult<Response> {
    let content = required_content(req.content)?;
    let author_id = req.author_id.unwrap_or(DEFAULT_AUTHOR_ID);
    let author = author_name(&state, author_id, UNKNOWN_POST_AUTHOR).await?;
    let title = req
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());

    let post = state
        .engagement
        .create_post(NewPost {
            author_id,
            author,
            title,
            content,
        })
        .await?;

    tracing::info!(post_id = post.id, author_id, "Post created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Post created successfully", "post": post })),
    )
        .into_response())
}

async fn toggle(state: &AppState, target: LikeTarget, req: LikeRequest) -> AppResult<Response> {
    let user_id = req
        .user_id
        .ok_or_else(|| AppError::Validation("user_id is required".into()))?;

    let outcome = state.engagement.toggle_like(target, user_id).await?;

    tracing::debug!(
        subject = target.subject().as_str(),
        subject_id = target.subject_id(),
        user_id,
        liked = outcome.liked,
        "Like toggled"
    );

    Ok(Json(json!({
        "message": outcome.message(target.subject()),
        "liked": outcome.liked,
        "likes_count": outcome.likes_count,
    }))
    .into_response())
}

/// POST /api/posts/{id}/like
pub async fn like_post(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    ApiJson(req): ApiJson<LikeRequest>,
) -> AppResult<Response> {
    toggle(&state, LikeTarget::Post { post_id }, req).await
}

/// POST /api/posts/{id}/comments/{comment_id}/like
pub async fn like_comment(
    State(state): State<AppState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    ApiJson(req): ApiJson<LikeRequest>,
) -> AppResult<Response> {
    toggle(
        &state,
        LikeTarget::Comment {
            post_id,
            comment_id,
        },
        req,
    )
    .await
}

/// GET /api/posts/{id}/comments
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> AppResult<Response> {
    let comments = state.engagement.list_comments(post_id).await?;
    let total = comments.len();
    Ok(Json(json!({ "comments": comments, "total": total })).into_response())
}

/// POST /api/posts/{id}/comments
pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> AppResult<Response> {
    let content = required_content(req.content)?;
    let author_id = req
        .author_id
        .ok_or_else(|| AppError::Validation("author_id is required".into()))?;
    let author = author_name(&state, author_id, UNKNOWN_COMMENT_AUTHOR).await?;

    let comment = state
        .engagement
        .add_comment(
            post_id,
            NewComment {
                author_id,
                author,
                content,
            },
        )
        .await?;

    tracing::info!(post_id, comment_id = comment.id, "Comment added");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Comment added successfully", "comment": comment })),
    )
        .into_response())
}
