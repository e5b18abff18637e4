use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::extractors::ApiJson;
use crate::state::AppState;
use crate::volunteer::domain::{check_schedule, ReviewDecision, VolunteerActivity};
use crate::volunteer::repository::{ActivityPatch, NewActivity};

// -- Request types --

#[derive(Deserialize)]
pub struct CreateActivityRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub max_volunteers: Option<i64>,
    pub created_by: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateActivityRequest {
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub max_volunteers: Option<i64>,
}

#[derive(Deserialize)]
pub struct ActingUser {
    pub user_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct JoinRequest {
    pub user_id: Option<i64>,
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub user_id: Option<i64>,
    pub notes: Option<String>,
}

fn require_user(user_id: Option<i64>) -> AppResult<i64> {
    user_id.ok_or_else(|| AppError::Validation("user_id is required".into()))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn check_capacity(max_volunteers: Option<i64>, current: i64) -> AppResult<()> {
    match max_volunteers {
        Some(max) if max < 1 => Err(AppError::Validation(
            "max_volunteers must be at least 1".into(),
        )),
        Some(max) if max < current => Err(AppError::Validation(format!(
            "max_volunteers cannot be below the {} approved volunteers",
            current
        ))),
        _ => Ok(()),
    }
}

async fn load_activity(state: &AppState, id: i64) -> AppResult<VolunteerActivity> {
    state
        .volunteer
        .find_activity(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Activity not found".into()))
}

/// Load the activity and require `acting_user` to be its creator.
async fn owned_activity(
    state: &AppState,
    id: i64,
    acting_user: i64,
) -> AppResult<VolunteerActivity> {
    let activity = load_activity(state, id).await?;
    if activity.created_by != acting_user {
        return Err(AppError::Forbidden(
            "Only the activity creator can modify it".into(),
        ));
    }
    Ok(activity)
}

// -- Handlers --

/// GET /api/volunteer-activities
pub async fn list_activities(State(state): State<AppState>) -> AppResult<Response> {
    let activities = state.volunteer.list_activities().await?;
    let total = activities.len();
    Ok(Json(json!({ "activities": activities, "total": total })).into_response())
}

/// POST /api/volunteer-activities
pub async fn create_activity(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateActivityRequest>,
) -> AppResult<Response> {
    let title =
        trimmed(req.title).ok_or_else(|| AppError::Validation("title is required".into()))?;
    let created_by = req
        .created_by
        .ok_or_else(|| AppError::Validation("created_by is required".into()))?;
    let start_date = trimmed(req.start_date);
    let end_date = trimmed(req.end_date);
    check_schedule(start_date.as_deref(), end_date.as_deref())?;
    check_capacity(req.max_volunteers, 0)?;

    let activity = state
        .volunteer
        .create_activity(NewActivity {
            title,
            description: trimmed(req.description).unwrap_or_default(),
            location: trimmed(req.location),
            created_by,
            start_date,
            end_date,
            max_volunteers: req.max_volunteers,
        })
        .await?;

    tracing::info!(activity_id = activity.id, created_by, "Volunteer activity created");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Activity created successfully", "activity": activity })),
    )
        .into_response())
}

/// PUT /api/volunteer-activities/{id}
pub async fn update_activity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<UpdateActivityRequest>,
) -> AppResult<Response> {
    let acting_user = require_user(req.user_id)?;
    let current = owned_activity(&state, id, acting_user).await?;

    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::Validation("title cannot be blank".into()));
    }

    let start_date = trimmed(req.start_date);
    let end_date = trimmed(req.end_date);
    // Validate the window as it will be after the patch
    check_schedule(
        start_date.as_deref().or(current.start_date.as_deref()),
        end_date.as_deref().or(current.end_date.as_deref()),
    )?;
    check_capacity(req.max_volunteers, current.current_volunteers)?;

    let activity = state
        .volunteer
        .update_activity(
            id,
            ActivityPatch {
                title: trimmed(req.title),
                description: req.description.map(|d| d.trim().to_string()),
                location: trimmed(req.location),
                start_date,
                end_date,
                max_volunteers: req.max_volunteers,
            },
        )
        .await?;

    tracing::info!(activity_id = id, "Volunteer activity updated");

    Ok(Json(json!({ "message": "Activity updated successfully", "activity": activity }))
        .into_response())
}

/// DELETE /api/volunteer-activities/{id}
pub async fn delete_activity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<ActingUser>,
) -> AppResult<Response> {
    let acting_user = require_user(req.user_id)?;
    owned_activity(&state, id, acting_user).await?;

    state.volunteer.delete_activity(id).await?;

    tracing::info!(activity_id = id, "Volunteer activity deleted");

    Ok(Json(json!({ "message": "Activity deleted successfully" })).into_response())
}

/// POST /api/volunteer-activities/{id}/join
pub async fn join_activity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(req): ApiJson<JoinRequest>,
) -> AppResult<Response> {
    let user_id = require_user(req.user_id)?;
    let activity = load_activity(&state, id).await?;
    let message = trimmed(req.message).unwrap_or_else(|| activity.default_join_message());

    let request = state
        .volunteer
        .create_request(activity.id, user_id, message)
        .await?;

    tracing::info!(activity_id = id, user_id, request_id = request.id, "Join requested");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Request submitted successfully", "request": request })),
    )
        .into_response())
}

/// GET /api/volunteer-activities/{id}/requests
pub async fn list_requests(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    load_activity(&state, id).await?;
    let requests = state.volunteer.list_requests(id).await?;
    let total = requests.len();
    Ok(Json(json!({ "requests": requests, "total": total })).into_response())
}

async fn review(
    state: &AppState,
    activity_id: i64,
    request_id: i64,
    req: ReviewRequest,
    decision: ReviewDecision,
) -> AppResult<Response> {
    let acting_user = require_user(req.user_id)?;
    let activity = load_activity(state, activity_id).await?;
    let request = state
        .volunteer
        .find_request(request_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Request not found".into()))?;

    let reviewed = request.review(
        &activity,
        acting_user,
        decision,
        trimmed(req.notes),
        Utc::now(),
    )?;
    let saved = state.volunteer.save_review(&reviewed).await?;

    tracing::info!(
        activity_id,
        request_id,
        reviewed_by = acting_user,
        status = %saved.status,
        "Join request reviewed"
    );

    let message = match decision {
        ReviewDecision::Approve => "Request approved",
        ReviewDecision::Reject => "Request rejected",
    };
    Ok(Json(json!({ "message": message, "request": saved })).into_response())
}

/// POST /api/volunteer-activities/{id}/requests/{request_id}/approve
pub async fn approve_request(
    State(state): State<AppState>,
    Path((activity_id, request_id)): Path<(i64, i64)>,
    ApiJson(req): ApiJson<ReviewRequest>,
) -> AppResult<Response> {
    review(&state, activity_id, request_id, req, ReviewDecision::Approve).await
}

/// POST /api/volunteer-activities/{id}/requests/{request_id}/reject
pub async fn reject_request(
    State(state): State<AppState>,
    Path((activity_id, request_id)): Path<(i64, i64)>,
    ApiJson(req): ApiJson<ReviewRequest>,
) -> AppResult<Response> {
    review(&state, activity_id, request_id, req, ReviewDecision::Reject).await
}
