use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{password, validation};
use crate::db::models::{ModerationStatus, Role, User};
use crate::db::users;
use crate::error::{AppError, AppResult};
use crate::experience::LooseInt;
use crate::extractors::{AppJson, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/profile", get(profile).put(update_profile))
        .route("/users/password", put(change_password))
        .route("/users/{username}", get(public_profile))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileLinks {
    pub bio: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub twitter: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub branch: Option<String>,
    pub graduation_year: Option<LooseInt>,
    pub current_company: Option<String>,
    pub is_alumni: Option<bool>,
    pub profile: Option<ProfileLinks>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Blank strings clear optional fields.
fn optional_text(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl ProfileUpdate {
    /// Fold the provided fields into `user`. Absent fields are left untouched.
    pub fn apply_to(self, user: &mut User) -> AppResult<()> {
        if let Some(name) = self.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::BadRequest("Name cannot be empty".into()));
            }
            user.name = name.to_string();
        }
        if let Some(branch) = self.branch {
            user.branch = optional_text(branch);
        }
        if let Some(year) = self.graduation_year {
            user.graduation_year = Some(
                year.as_i32()
                    .ok_or_else(|| AppError::BadRequest("Graduation year must be a number".into()))?,
            );
        }
        if let Some(company) = self.current_company {
            user.current_company = optional_text(company);
        }
        if let Some(is_alumni) = self.is_alumni {
            user.is_alumni = is_alumni;
            // Admins keep their role regardless of the alumni flag
            if user.role != Role::Admin {
                user.role = if is_alumni { Role::Alumni } else { Role::Student };
            }
        }
        if let Some(links) = self.profile {
            if let Some(bio) = links.bio {
                validation::bio(bio.trim())?;
                user.profile.bio = optional_text(bio);
            }
            if let Some(linkedin) = links.linkedin {
                user.profile.linkedin = optional_text(linkedin);
            }
            if let Some(github) = links.github {
                user.profile.github = optional_text(github);
            }
            if let Some(twitter) = links.twitter {
                user.profile.twitter = optional_text(twitter);
            }
        }
        Ok(())
    }
}

/// GET /api/users/profile
async fn profile(CurrentUser(user): CurrentUser) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "user": user }))
}

/// PUT /api/users/profile
async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(mut user): CurrentUser,
    AppJson(changes): AppJson<ProfileUpdate>,
) -> AppResult<Json<serde_json::Value>> {
    changes.apply_to(&mut user)?;
    let updated = users::update_profile(&state.db, &user)?;
    Ok(Json(json!({ "success": true, "user": updated })))
}

/// PUT /api/users/password
async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    AppJson(req): AppJson<PasswordChange>,
) -> AppResult<Json<serde_json::Value>> {
    let current = req.current_password.unwrap_or_default();
    let new_password = req.new_password.unwrap_or_default();
    if current.is_empty() || new_password.is_empty() {
        return Err(AppError::BadRequest(
            "Please provide current and new password".into(),
        ));
    }
    if !password::verify(&current, &user.password_hash) {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".into(),
        ));
    }
    validation::password(&new_password)?;

    let hash = password::hash(&new_password, state.config.auth.bcrypt_cost)?;
    users::set_password_hash(&state.db, &user.id, &hash)?;
    tracing::info!("Password changed for {}", user.username);

    Ok(Json(
        json!({ "success": true, "message": "Password updated successfully" }),
    ))
}

/// GET /api/users/{username} - public profile with approved experiences
async fn public_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let user = users::find_by_username(&state.db, &username.trim().to_lowercase())?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let experiences: Vec<_> = state
        .experiences
        .list_by_author(&user.id)
        .await?
        .into_iter()
        .filter(|e| e.moderation_status == ModerationStatus::Approved)
        .collect();

    Ok(Json(json!({
        "success": true,
        "user": user,
        "experiences": experiences,
    })))
}
