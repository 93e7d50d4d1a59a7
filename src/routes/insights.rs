use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::db::models::{Experience, ModerationStatus};
use crate::error::{AppError, AppResult};
use crate::insights::{self, CompanySummary, Insights};
use crate::questions::{self, export, QuestionQuery};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/insights", get(overview))
        .route("/insights/questions", get(question_index))
        .route("/insights/questions/export", get(export_questions))
        .route("/companies", get(companies))
}

async fn approved(state: &AppState) -> AppResult<Vec<Experience>> {
    Ok(state
        .experiences
        .list(Some(ModerationStatus::Approved))
        .await?)
}

/// GET /api/insights
async fn overview(State(state): State<AppState>) -> AppResult<Json<Insights>> {
    Ok(Json(insights::compute(&approved(&state).await?)))
}

/// GET /api/insights/questions?company=&role=
async fn question_index(
    State(state): State<AppState>,
    Query(query): Query<QuestionQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let found = questions::search(&approved(&state).await?, &query);
    Ok(Json(json!({
        "success": true,
        "questions": found.questions,
        "availableRoles": found.available_roles,
    })))
}

/// GET /api/insights/questions/export?company=&role=
async fn export_questions(
    State(state): State<AppState>,
    Query(query): Query<QuestionQuery>,
) -> AppResult<impl IntoResponse> {
    let found = questions::search(&approved(&state).await?, &query);
    if found.questions.is_empty() {
        return Err(AppError::BadRequest("No questions to export".into()));
    }

    let bytes = export::export_pdf(&found.questions, &query)?;
    let disposition = format!("attachment; filename=\"{}\"", export::filename(&query));
    tracing::info!(
        "Exported {} questions ({} bytes)",
        found.questions.len(),
        bytes.len()
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

/// GET /api/companies
async fn companies(State(state): State<AppState>) -> AppResult<Json<Vec<CompanySummary>>> {
    Ok(Json(insights::company_rollup(&approved(&state).await?)))
}
