use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::auth::{password, validation};
use crate::db::models::{Role, User};
use crate::db::users::{self, NewUser};
use crate::error::{AppError, AppResult};
use crate::experience::LooseInt;
use crate::extractors::{AppJson, CurrentUser};
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub branch: Option<String>,
    pub graduation_year: Option<LooseInt>,
    pub is_alumni: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(alias = "email", alias = "username")]
    pub identifier: Option<String>,
    pub password: Option<String>,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

/// Requested role if it is student or alumni, otherwise derived from the alumni flag.
/// Registration never yields an admin.
pub fn registration_role(requested: Option<&str>, is_alumni: bool) -> Role {
    match requested.and_then(|r| r.trim().parse::<Role>().ok()) {
        Some(role @ (Role::Student | Role::Alumni)) => role,
        _ if is_alumni => Role::Alumni,
        _ => Role::Student,
    }
}

fn auth_response(state: &AppState, user: &User) -> AppResult<serde_json::Value> {
    let token = state.tokens.issue(&user.id)?;
    Ok(json!({ "success": true, "token": token, "user": user }))
}

// -- Handlers --

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    if !(present(&req.name) && present(&req.username) && present(&req.email) && present(&req.password))
    {
        return Err(AppError::BadRequest(
            "Please provide name, username, email, and password".into(),
        ));
    }
    let raw_password = req.password.unwrap_or_default();

    let username = state
        .rules
        .username(req.username.as_deref().unwrap_or_default())?;
    let email = state.rules.email(req.email.as_deref().unwrap_or_default())?;
    validation::password(&raw_password)?;

    if users::find_by_email(&state.db, &email)?.is_some() {
        return Err(AppError::Conflict(
            "User already exists with this email".into(),
        ));
    }
    if users::find_by_username(&state.db, &username)?.is_some() {
        return Err(AppError::Conflict("This username is already taken".into()));
    }

    let is_alumni = req.is_alumni.unwrap_or(false);
    let new_user = NewUser {
        name: req.name.unwrap_or_default().trim().to_string(),
        username,
        email,
        password_hash: password::hash(&raw_password, state.config.auth.bcrypt_cost)?,
        role: registration_role(req.role.as_deref(), is_alumni),
        branch: req
            .branch
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty()),
        graduation_year: req.graduation_year.as_ref().and_then(LooseInt::as_i32),
        is_alumni,
    };

    // A concurrent registration can still win the race; the unique index decides
    let user = users::create(&state.db, new_user)?;
    tracing::info!("Registered user {} ({})", user.username, user.role);

    Ok((StatusCode::CREATED, Json(auth_response(&state, &user)?)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let identifier = req.identifier.as_deref().map(str::trim).unwrap_or_default();
    // Compared verbatim, as hashed at registration
    let given_password = req.password.as_deref().unwrap_or_default();
    if identifier.is_empty() || given_password.is_empty() {
        return Err(AppError::BadRequest(
            "Please provide email/username and password".into(),
        ));
    }

    let invalid = || AppError::Unauthorized("Invalid credentials".into());
    let user = users::find_by_identifier(&state.db, identifier)?.ok_or_else(invalid)?;
    if !password::verify(given_password, &user.password_hash) {
        tracing::info!("Failed login for {}", user.username);
        return Err(invalid());
    }

    Ok(Json(auth_response(&state, &user)?))
}

/// GET /api/auth/me
pub async fn me(CurrentUser(user): CurrentUser) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "user": user }))
}
