use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::auth::password::{self, Credential};
use crate::db::models::{CredentialSource, Role, User};
use crate::error::{AppError, AppResult};
use crate::extractors::{ApiJson, SessionClaims};
use crate::state::AppState;
use crate::users::{normalize_email, NewUser};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
    pub bio: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct CheckEmailRequest {
    pub email: Option<String>,
}

fn required(field: &str, value: Option<String>) -> AppResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("{} is required", field))),
    }
}

fn session_response(
    state: &AppState,
    status: StatusCode,
    message: &str,
    user: &User,
) -> AppResult<Response> {
    let token = state.tokens.issue(user)?;
    Ok((
        status,
        Json(json!({
            "message": message,
            "user": user.to_public(),
            "token": token,
        })),
    )
        .into_response())
}

// -- Handlers --

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> AppResult<Response> {
    let email = normalize_email(&required("email", req.email)?);
    let first_name = required("first_name", req.first_name)?;
    let last_name = required("last_name", req.last_name)?;
    // Passwords are taken verbatim; whitespace counts
    let plaintext = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("password is required".into()))?;

    let min_len = state.config.auth.min_password_len;
    if plaintext.chars().count() < min_len {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            min_len
        )));
    }

    let role = match req.role.as_deref().map(str::trim) {
        None | Some("") => Role::default(),
        Some(r) => r.parse::<Role>().map_err(AppError::Validation)?,
    };

    // The marker is reserved for embedded legacy credentials
    let bio = req.bio.map(|b| b.trim().to_string()).unwrap_or_default();
    if bio.starts_with(password::LEGACY_BIO_MARKER) {
        return Err(AppError::Validation("bio contains a reserved prefix".into()));
    }

    let credential =
        password::hash_password_blocking(plaintext, state.config.auth.bcrypt_cost).await?;

    let user = state
        .users
        .create(NewUser {
            email,
            first_name,
            last_name,
            role,
            bio,
            credential: Some(credential),
            auth_provider: "casira".into(),
            email_verified: false,
        })
        .await?;

    tracing::info!(user_id = user.id, role = %user.role, "User registered");

    session_response(&state, StatusCode::CREATED, "User registered successfully", &user)
}

/// POST /api/auth/login
///
/// Unknown email, inactive account, missing credential and wrong password all
/// produce the same 401.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AppResult<Response> {
    let email = required("email", req.email)?;
    let plaintext = req
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("password is required".into()))?;

    let user = state.users.find_by_email(&email).await?;
    let credential = user
        .as_ref()
        .filter(|u| u.is_active)
        .and_then(User::login_credential);

    let (check, source) = match credential {
        Some((c, s)) => (Some(c), Some(s)),
        None => (None, None),
    };

    let verified =
        password::verify_password_blocking(plaintext, check.clone(), state.config.auth.bcrypt_cost)
            .await;

    let (Some(user), Some(credential), true) = (user, check, verified) else {
        tracing::info!("Login rejected");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    if source == Some(CredentialSource::LegacyBio) {
        migrate_legacy(&state, &user, &credential).await;
    }

    spawn_touch_last_login(&state, user.id);

    tracing::info!(user_id = user.id, "User logged in");

    session_response(&state, StatusCode::OK, "Login successful", &user)
}

/// Best-effort: a failed migration leaves the legacy bio in place and still logs in.
async fn migrate_legacy(state: &AppState, user: &User, credential: &Credential) {
    let visible = password::visible_bio(&user.bio);
    match state
        .users
        .migrate_legacy_credential(user.id, credential, visible)
        .await
    {
        Ok(()) => tracing::info!(user_id = user.id, "Migrated legacy credential"),
        Err(e) => tracing::warn!(user_id = user.id, "Legacy credential migration failed: {}", e),
    }
}

fn spawn_touch_last_login(state: &AppState, user_id: i64) {
    let users = state.users.clone();
    tokio::spawn(async move {
        if let Err(e) = users.touch_last_login(user_id, Utc::now()).await {
            tracing::warn!(user_id, "Failed to update last_login: {}", e);
        }
    });
}

/// POST /api/auth/check-email
pub async fn check_email(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CheckEmailRequest>,
) -> AppResult<Response> {
    let email = required("email", req.email)?;
    let exists = state.users.email_exists(&email).await?;
    Ok(Json(json!({ "exists": exists })).into_response())
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    SessionClaims(claims): SessionClaims,
) -> AppResult<Response> {
    let user = state
        .users
        .find_by_id(claims.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("Invalid token".into()))?;

    Ok(Json(json!({
        "claims": claims,
        "user": user.to_public(),
    }))
    .into_response())
}
