use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::comments;
use crate::db::models::Comment;
use crate::error::{AppError, AppResult};
use crate::experience::can_view;
use crate::extractors::{AppJson, CurrentUser, MaybeUser};
use crate::state::AppState;

pub const COMMENT_MAX: usize = 1000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/experiences/{id}/comments",
            get(list_comments).post(add_comment),
        )
        .route("/comments/{id}", delete(delete_comment))
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: Option<String>,
}

fn validate_content(raw: Option<String>) -> AppResult<String> {
    let content = raw.map(|c| c.trim().to_string()).unwrap_or_default();
    if content.is_empty() {
        return Err(AppError::BadRequest("Comment cannot be empty".into()));
    }
    if content.chars().count() > COMMENT_MAX {
        return Err(AppError::BadRequest(format!(
            "Comment cannot exceed {} characters",
            COMMENT_MAX
        )));
    }
    Ok(content)
}

/// GET /api/experiences/{id}/comments
async fn list_comments(
    State(state): State<AppState>,
    Path(experience_id): Path<String>,
    MaybeUser(viewer): MaybeUser,
) -> AppResult<Json<Vec<Comment>>> {
    let experience = state
        .experiences
        .get(&experience_id)
        .await?
        .filter(|e| can_view(e, viewer.as_ref()))
        .ok_or_else(|| AppError::NotFound("Experience not found".into()))?;

    Ok(Json(comments::list_for_experience(&state.db, &experience.id)?))
}

/// POST /api/experiences/{id}/comments
async fn add_comment(
    State(state): State<AppState>,
    Path(experience_id): Path<String>,
    CurrentUser(user): CurrentUser,
    AppJson(req): AppJson<CommentRequest>,
) -> AppResult<impl IntoResponse> {
    let content = validate_content(req.content)?;
    let experience = state
        .experiences
        .get(&experience_id)
        .await?
        .filter(|e| can_view(e, Some(&user)))
        .ok_or_else(|| AppError::NotFound("Experience not found".into()))?;

    let comment = comments::create(&state.db, &experience.id, &user.id, &content)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// DELETE /api/comments/{id} - only the comment's author
async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<serde_json::Value>> {
    let comment = comments::find_by_id(&state.db, &id)?
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;
    if comment.author.id != user.id {
        return Err(AppError::Forbidden(
            "Not authorized to delete this comment".into(),
        ));
    }

    comments::delete(&state.db, &id)?;
    Ok(Json(json!({ "success": true, "message": "Comment deleted" })))
}
