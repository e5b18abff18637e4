use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::password;
use crate::db::models::CredentialSource;
use crate::error::{AppError, AppResult};
use crate::extractors::ApiJson;
use crate::state::AppState;
use crate::users::ProfileUpdate;

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub user_id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

/// GET /api/users/{id}
pub async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Response> {
    let user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(json!({ "user": user.to_public() })).into_response())
}

/// POST /api/users/profile
///
/// Name and bio only. Email, role and credentials are not editable here.
pub async fn update_profile(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> AppResult<Response> {
    let user_id = req
        .user_id
        .ok_or_else(|| AppError::Validation("user_id is required".into()))?;

    let first_name = non_blank("first_name", req.first_name)?;
    let last_name = non_blank("last_name", req.last_name)?;
    let bio = req.bio.map(|b| b.trim().to_string());

    if first_name.is_none() && last_name.is_none() && bio.is_none() {
        return Err(AppError::Validation(
            "Nothing to update: provide first_name, last_name or bio".into(),
        ));
    }

    if bio.is_some() {
        preserve_legacy_credential(&state, user_id).await?;
    }

    let user = state
        .users
        .update_profile(
            user_id,
            ProfileUpdate {
                first_name,
                last_name,
                bio,
            },
        )
        .await?;

    tracing::info!(user_id, "Profile updated");

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": user.to_public(),
    }))
    .into_response())
}

/// Overwriting a legacy bio would drop the hash embedded in it, so move it first.
async fn preserve_legacy_credential(state: &AppState, user_id: i64) -> AppResult<()> {
    let Some(user) = state.users.find_by_id(user_id).await? else {
        return Ok(());
    };

    if let Some((credential, CredentialSource::LegacyBio)) = user.login_credential() {
        state
            .users
            .migrate_legacy_credential(user_id, &credential, password::visible_bio(&user.bio))
            .await?;
        tracing::info!(user_id, "Migrated legacy credential before bio update");
    }
    Ok(())
}

fn non_blank(field: &str, value: Option<String>) -> AppResult<Option<String>> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Err(AppError::Validation(format!("{} cannot be blank", field))),
        other => Ok(other),
    }
}
