use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde_json::json;

use crate::db::models::{Experience, ModerationStatus, User};
use crate::error::{AppError, AppResult};
use crate::experience::{
    self, can_edit, can_view, ExperienceFilter, ExperienceInput, ExperienceUpdate, FilterOptions,
};
use crate::extractors::{AppJson, CurrentUser, MaybeUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/experiences", get(list).post(create))
        .route("/experiences/filters", get(filters))
        .route("/experiences/my", get(my_experiences))
        .route(
            "/experiences/{id}",
            get(get_one).put(update).delete(remove),
        )
        .route(
            "/experiences/{id}/rounds/{round_number}",
            delete(remove_round),
        )
}

fn not_found() -> AppError {
    AppError::NotFound("Experience not found".into())
}

async fn load_editable(state: &AppState, id: &str, user: &User) -> AppResult<Experience> {
    let experience = state.experiences.get(id).await?.ok_or_else(not_found)?;
    if !can_edit(&experience, user) {
        return Err(AppError::Forbidden(
            "Not authorized to modify this experience".into(),
        ));
    }
    Ok(experience)
}

/// GET /api/experiences - approved experiences matching the filters, newest first
async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ExperienceFilter>,
) -> AppResult<Json<Vec<Experience>>> {
    let approved = state
        .experiences
        .list(Some(ModerationStatus::Approved))
        .await?;
    Ok(Json(filter.apply(approved)))
}

/// GET /api/experiences/filters
async fn filters(State(state): State<AppState>) -> AppResult<Json<FilterOptions>> {
    let approved = state
        .experiences
        .list(Some(ModerationStatus::Approved))
        .await?;
    Ok(Json(experience::filter_options(&approved)))
}

/// GET /api/experiences/my - the caller's own submissions in any status
async fn my_experiences(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Experience>>> {
    Ok(Json(state.experiences.list_by_author(&user.id).await?))
}

/// GET /api/experiences/{id} - counts as one view
async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
    MaybeUser(viewer): MaybeUser,
) -> AppResult<Json<Experience>> {
    let experience = state.experiences.get(&id).await?.ok_or_else(not_found)?;
    // Unpublished records are invisible rather than forbidden
    if !can_view(&experience, viewer.as_ref()) {
        return Err(not_found());
    }

    let viewed = state
        .experiences
        .record_view(&id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(viewed))
}

/// POST /api/experiences - signed-in or anonymous submission
async fn create(
    State(state): State<AppState>,
    MaybeUser(author): MaybeUser,
    AppJson(input): AppJson<ExperienceInput>,
) -> AppResult<impl IntoResponse> {
    let new = input.validate(author.as_ref())?;
    let created = state.experiences.insert(new).await?;
    tracing::info!(
        "New experience {} at {} awaiting moderation",
        created.id,
        created.company
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/experiences/{id}
async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(user): CurrentUser,
    AppJson(changes): AppJson<ExperienceUpdate>,
) -> AppResult<Json<Experience>> {
    let mut experience = load_editable(&state, &id, &user).await?;
    changes.apply_to(&mut experience)?;
    Ok(Json(state.experiences.update(&experience).await?))
}

/// DELETE /api/experiences/{id}
async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<serde_json::Value>> {
    load_editable(&state, &id, &user).await?;
    if !state.experiences.delete(&id).await? {
        return Err(not_found());
    }
    tracing::info!("Experience {} deleted by {}", id, user.username);
    Ok(Json(
        json!({ "success": true, "message": "Experience deleted successfully" }),
    ))
}

/// DELETE /api/experiences/{id}/rounds/{round_number}
async fn remove_round(
    State(state): State<AppState>,
    Path((id, round_number)): Path<(String, u32)>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Experience>> {
    let mut experience = load_editable(&state, &id, &user).await?;
    experience::remove_round(&mut experience.rounds, round_number)?;
    Ok(Json(state.experiences.update(&experience).await?))
}
