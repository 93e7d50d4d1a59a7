use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{ModerationStatus, ReportStatus, Role, User};
use crate::db::reports::{self, ReportReview};
use crate::db::users::{self, UserFilter};
use crate::db::{announcements, companies};
use crate::error::{AppError, AppResult};
use crate::experience::LooseInt;
use crate::extractors::{AdminUser, AppJson};
use crate::moderation::{self, ModerationAction};
use crate::routes::announcements::AnnouncementRequest;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(stats))
        .route("/admin/experiences", get(list_experiences))
        .route("/admin/experiences/pending", get(pending_experiences))
        .route("/admin/experiences/{id}", delete(delete_experience))
        .route("/admin/experiences/{id}/approve", put(approve))
        .route("/admin/experiences/{id}/reject", put(reject))
        .route("/admin/experiences/{id}/standardize", put(standardize))
        .route("/admin/reports", get(list_reports))
        .route("/admin/reports/{id}", put(review_report))
        .route(
            "/admin/announcements",
            get(list_announcements).post(create_announcement),
        )
        .route(
            "/admin/announcements/{id}",
            put(update_announcement).delete(delete_announcement),
        )
        .route("/admin/companies", get(company_names))
        .route(
            "/admin/company-standardizations",
            get(list_standardizations).post(create_standardization),
        )
        .route(
            "/admin/company-standardizations/{id}",
            put(update_standardization).delete(delete_standardization),
        )
        .route("/admin/users", get(list_users))
        .route("/admin/users/filters", get(user_filters))
}

fn data<T: serde::Serialize>(value: T) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": value }))
}

fn deleted(message: &str) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "message": message }))
}

/// `?status=` where absent, empty or `all` means no filter.
fn status_filter<T: std::str::FromStr>(raw: Option<&str>) -> AppResult<Option<T>> {
    match raw.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("Invalid status: {}", value))),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

// -- Stats --

/// GET /api/admin/stats
async fn stats(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<serde_json::Value>> {
    let experiences = state.experiences.counts().await?;
    let reports = reports::counts(&state.db)?;
    let announcements = announcements::counts(&state.db, Utc::now())?;
    let users = users::counts(&state.db)?;

    Ok(data(json!({
        "experiences": experiences,
        "reports": reports,
        "announcements": announcements,
        "users": users,
    })))
}

// -- Moderation --

/// GET /api/admin/experiences?status=
async fn list_experiences(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let status = status_filter::<ModerationStatus>(query.status.as_deref())?;
    Ok(data(state.experiences.list(status).await?))
}

/// GET /api/admin/experiences/pending
async fn pending_experiences(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<serde_json::Value>> {
    Ok(data(
        state
            .experiences
            .list(Some(ModerationStatus::Pending))
            .await?,
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct ModerationRequest {
    pub notes: Option<String>,
}

async fn moderate(
    state: &AppState,
    id: &str,
    admin: &User,
    action: ModerationAction,
    notes: Option<String>,
) -> AppResult<Json<serde_json::Value>> {
    let experience = state
        .experiences
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Experience not found".into()))?;

    let decision = moderation::decide(
        experience.moderation_status,
        action,
        notes,
        &admin.id,
        Utc::now(),
    )?;
    let updated = state
        .experiences
        .apply_moderation(id, experience.moderation_status, &decision)
        .await?;
    tracing::info!(
        "Experience {} {} by {}",
        id,
        decision.status,
        admin.username
    );

    Ok(data(updated))
}

/// PUT /api/admin/experiences/{id}/approve
async fn approve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AdminUser(admin): AdminUser,
    body: Option<AppJson<ModerationRequest>>,
) -> AppResult<Json<serde_json::Value>> {
    let notes = body.and_then(|AppJson(b)| b.notes);
    moderate(&state, &id, &admin, ModerationAction::Approve, notes).await
}

/// PUT /api/admin/experiences/{id}/reject
async fn reject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AdminUser(admin): AdminUser,
    body: Option<AppJson<ModerationRequest>>,
) -> AppResult<Json<serde_json::Value>> {
    let notes = body.and_then(|AppJson(b)| b.notes);
    moderate(&state, &id, &admin, ModerationAction::Reject, notes).await
}

/// DELETE /api/admin/experiences/{id}
async fn delete_experience(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AdminUser(admin): AdminUser,
) -> AppResult<Json<serde_json::Value>> {
    if !state.experiences.delete(&id).await? {
        return Err(AppError::NotFound("Experience not found".into()));
    }
    tracing::info!("Experience {} deleted by admin {}", id, admin.username);
    Ok(deleted("Experience deleted successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizeRequest {
    pub standard_name: Option<String>,
}

/// PUT /api/admin/experiences/{id}/standardize
async fn standardize(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AdminUser(_admin): AdminUser,
    AppJson(req): AppJson<StandardizeRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let requested = req.standard_name.unwrap_or_default();
    if requested.trim().is_empty() {
        return Err(AppError::BadRequest("Standard name is required".into()));
    }
    let entry = companies::find_by_standard_name(&state.db, &requested)?.ok_or_else(|| {
        AppError::BadRequest(format!(
            "No standardization exists for {}",
            requested.trim()
        ))
    })?;

    let updated = state
        .experiences
        .set_company(&id, &entry.standard_name)
        .await?;
    Ok(data(updated))
}

// -- Reports --

/// GET /api/admin/reports?status=
async fn list_reports(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<StatusQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let status = status_filter::<ReportStatus>(query.status.as_deref())?;
    Ok(data(reports::list(&state.db, status)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub status: Option<String>,
    pub admin_notes: Option<String>,
}

/// PUT /api/admin/reports/{id}
async fn review_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AdminUser(admin): AdminUser,
    AppJson(req): AppJson<ReviewRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let status = match req.status.as_deref().map(str::trim) {
        Some("resolved") => ReportStatus::Resolved,
        Some("dismissed") => ReportStatus::Dismissed,
        _ => {
            return Err(AppError::BadRequest(
                "Status must be resolved or dismissed".into(),
            ))
        }
    };

    let report = reports::review(
        &state.db,
        &id,
        &ReportReview {
            status,
            admin_notes: req
                .admin_notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
            reviewer_id: admin.id,
            reviewed_at: Utc::now(),
        },
    )?;
    Ok(data(report))
}

// -- Announcements --

/// GET /api/admin/announcements - every announcement, newest first
async fn list_announcements(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<serde_json::Value>> {
    Ok(data(announcements::list_all(&state.db)?))
}

/// POST /api/admin/announcements
async fn create_announcement(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(req): AppJson<AnnouncementRequest>,
) -> AppResult<impl IntoResponse> {
    let draft = req.into_draft(None, Utc::now())?;
    let created = announcements::create(&state.db, &draft, &admin.id)?;
    tracing::info!("Announcement {} published by {}", created.id, admin.username);
    Ok((StatusCode::CREATED, data(created)))
}

/// PUT /api/admin/announcements/{id}
async fn update_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AdminUser(_admin): AdminUser,
    AppJson(req): AppJson<AnnouncementRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let existing = announcements::find_by_id(&state.db, &id)?
        .ok_or_else(|| AppError::NotFound("Announcement not found".into()))?;
    let draft = req.into_draft(Some(&existing), Utc::now())?;
    Ok(data(announcements::update(&state.db, &id, &draft)?))
}

/// DELETE /api/admin/announcements/{id}
async fn delete_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<serde_json::Value>> {
    if !announcements::delete(&state.db, &id)? {
        return Err(AppError::NotFound("Announcement not found".into()));
    }
    Ok(deleted("Announcement deleted successfully"))
}

// -- Companies --

/// GET /api/admin/companies - every company name in use, any status
async fn company_names(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<serde_json::Value>> {
    Ok(data(state.experiences.company_counts().await?))
}

/// A list of names, or one comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Variations {
    List(Vec<String>),
    Joined(String),
}

impl Variations {
    /// Trimmed, non-empty, first occurrence wins.
    pub fn normalize(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            Variations::List(items) => items,
            Variations::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        };
        let mut out: Vec<String> = Vec::new();
        for item in raw {
            let item = item.trim();
            if !item.is_empty() && !out.iter().any(|o| o == item) {
                out.push(item.to_string());
            }
        }
        out
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardizationRequest {
    pub standard_name: Option<String>,
    pub variations: Option<Variations>,
}

impl StandardizationRequest {
    fn validate(self) -> AppResult<(String, Vec<String>)> {
        let name = self
            .standard_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::BadRequest("Standard name is required".into()))?;
        let variations = self.variations.map(Variations::normalize).unwrap_or_default();
        Ok((name, variations))
    }
}

/// GET /api/admin/company-standardizations
async fn list_standardizations(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<serde_json::Value>> {
    Ok(data(companies::list(&state.db)?))
}

/// POST /api/admin/company-standardizations
async fn create_standardization(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(req): AppJson<StandardizationRequest>,
) -> AppResult<impl IntoResponse> {
    let (name, variations) = req.validate()?;
    let created = companies::create(&state.db, &name, &variations, &admin.id)?;
    Ok((StatusCode::CREATED, data(created)))
}

/// PUT /api/admin/company-standardizations/{id}
async fn update_standardization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AdminUser(_admin): AdminUser,
    AppJson(req): AppJson<StandardizationRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let (name, variations) = req.validate()?;
    Ok(data(companies::update(&state.db, &id, &name, &variations)?))
}

/// DELETE /api/admin/company-standardizations/{id}
async fn delete_standardization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<serde_json::Value>> {
    if !companies::delete(&state.db, &id)? {
        return Err(AppError::NotFound("Standardization not found".into()));
    }
    Ok(deleted("Company standardization deleted successfully"))
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<String>,
    pub branch: Option<String>,
    pub year: Option<String>,
    pub search: Option<String>,
}

impl UserQuery {
    fn into_filter(self) -> AppResult<UserFilter> {
        let non_blank = |v: Option<String>| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && s != "all")
        };

        let role = match non_blank(self.role) {
            Some(raw) => Some(
                raw.parse::<Role>()
                    .map_err(|_| AppError::BadRequest(format!("Invalid role: {}", raw)))?,
            ),
            None => None,
        };
        let graduation_year = match non_blank(self.year) {
            Some(raw) => Some(
                LooseInt::Text(raw.clone())
                    .as_i32()
                    .ok_or_else(|| AppError::BadRequest(format!("Invalid year: {}", raw)))?,
            ),
            None => None,
        };

        Ok(UserFilter {
            role,
            branch: non_blank(self.branch),
            graduation_year,
            search: non_blank(self.search),
        })
    }
}

/// GET /api/admin/users?role=&branch=&year=&search=
async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let filter = query.into_filter()?;
    Ok(data(users::list(&state.db, &filter)?))
}

/// GET /api/admin/users/filters
async fn user_filters(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<Json<serde_json::Value>> {
    Ok(data(users::filter_options(&state.db)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variations_accept_list_or_comma_string() {
        let joined: Variations = serde_json::from_value(json!("TCS, Tata Consultancy ,,TCS")).unwrap();
        assert_eq!(joined.normalize(), vec!["TCS", "Tata Consultancy"]);

        let list: Variations = serde_json::from_value(json!([" Infy ", "", "Infosys Ltd"])).unwrap();
        assert_eq!(list.normalize(), vec!["Infy", "Infosys Ltd"]);
    }

    #[test]
    fn standardization_requires_a_name() {
        let req: StandardizationRequest =
            serde_json::from_value(json!({ "standardName": "  ", "variations": "a" })).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn status_filter_treats_all_as_unfiltered() {
        assert_eq!(status_filter::<ModerationStatus>(Some("all")).unwrap(), None);
        assert_eq!(status_filter::<ModerationStatus>(None).unwrap(), None);
        assert_eq!(
            status_filter::<ModerationStatus>(Some("rejected")).unwrap(),
            Some(ModerationStatus::Rejected)
        );
        assert!(status_filter::<ModerationStatus>(Some("archived")).is_err());
    }

    #[test]
    fn user_query_parses_role_and_year() {
        let filter = UserQuery {
            role: Some("alumni".into()),
            year: Some("2024".into()),
            branch: Some(" ".into()),
            search: Some("asha".into()),
        }
        .into_filter()
        .unwrap();
        assert_eq!(filter.role, Some(Role::Alumni));
        assert_eq!(filter.graduation_year, Some(2024));
        assert_eq!(filter.branch, None);
        assert_eq!(filter.search.as_deref(), Some("asha"));

        assert!(UserQuery {
            role: Some("dean".into()),
            ..Default::default()
        }
        .into_filter()
        .is_err());
    }
}
