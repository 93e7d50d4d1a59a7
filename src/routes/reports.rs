use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::ReportReason;
use crate::db::reports::{self, NewReport};
use crate::error::{AppError, AppResult};
use crate::experience::can_view;
use crate::extractors::{AppJson, CurrentUser};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/experiences/{id}/reports", post(file_report))
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub reason: Option<String>,
    pub description: Option<String>,
}

/// POST /api/experiences/{id}/reports - flag an experience for admin review
async fn file_report(
    State(state): State<AppState>,
    Path(experience_id): Path<String>,
    CurrentUser(user): CurrentUser,
    AppJson(req): AppJson<ReportRequest>,
) -> AppResult<impl IntoResponse> {
    let reason: ReportReason = req
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| AppError::BadRequest("A report reason is required".into()))?
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid report reason".into()))?;

    let experience = state
        .experiences
        .get(&experience_id)
        .await?
        .filter(|e| can_view(e, Some(&user)))
        .ok_or_else(|| AppError::NotFound("Experience not found".into()))?;

    let report = reports::create(
        &state.db,
        NewReport {
            experience_id: experience.id,
            reporter_id: user.id,
            reason,
            description: req.description.unwrap_or_default().trim().to_string(),
        },
    )?;
    tracing::info!("Report {} filed against {}", report.id, report.experience.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": report })),
    ))
}
