use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::db::announcements::{self, AnnouncementDraft};
use crate::db::models::{Announcement, AnnouncementKind, Priority};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/announcements", get(live))
}

/// Body of the admin create/update endpoints. On update, absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub priority: Option<String>,
    pub published_at: Option<String>,
    /// Empty string clears the expiry
    pub expires_at: Option<String>,
    pub is_active: Option<bool>,
}

/// Accepts a bare date (midnight UTC) or an RFC 3339 timestamp.
fn parse_timestamp(field: &str, raw: &str) -> AppResult<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid {}: {}", field, raw)))
}

fn parse_choice<T: std::str::FromStr>(field: &str, raw: &str) -> AppResult<T> {
    raw.trim()
        .to_lowercase()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {}: {}", field, raw)))
}

impl AnnouncementRequest {
    /// Validate against `existing` (for updates) and produce the fields to store.
    pub fn into_draft(
        self,
        existing: Option<&Announcement>,
        now: DateTime<Utc>,
    ) -> AppResult<AnnouncementDraft> {
        let title = self
            .title
            .map(|t| t.trim().to_string())
            .or_else(|| existing.map(|a| a.title.clone()))
            .unwrap_or_default();
        let content = self
            .content
            .map(|c| c.trim().to_string())
            .or_else(|| existing.map(|a| a.content.clone()))
            .unwrap_or_default();
        if title.is_empty() || content.is_empty() {
            return Err(AppError::BadRequest(
                "Title and content are required".into(),
            ));
        }

        let kind = match self.kind.as_deref().filter(|k| !k.trim().is_empty()) {
            Some(raw) => parse_choice::<AnnouncementKind>("announcement type", raw)?,
            None => existing.map(|a| a.kind).unwrap_or_default(),
        };
        let priority = match self.priority.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(raw) => parse_choice::<Priority>("priority", raw)?,
            None => existing.map(|a| a.priority).unwrap_or_default(),
        };
        let published_at = match self.published_at.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(raw) => parse_timestamp("publish date", raw)?,
            None => existing.map_or(now, |a| a.published_at),
        };
        let expires_at = match self.expires_at.as_deref() {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(parse_timestamp("expiry date", raw)?),
            None => existing.and_then(|a| a.expires_at),
        };

        Ok(AnnouncementDraft {
            title,
            content,
            kind,
            priority,
            published_at,
            expires_at,
            is_active: self
                .is_active
                .or_else(|| existing.map(|a| a.is_active))
                .unwrap_or(true),
        })
    }
}

/// GET /api/announcements - active and unexpired, most urgent first
async fn live(State(state): State<AppState>) -> AppResult<Json<Vec<Announcement>>> {
    Ok(Json(announcements::list_live(&state.db, Utc::now())?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request(body: serde_json::Value) -> AnnouncementRequest {
        serde_json::from_value(body).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn new_announcement_defaults() {
        let draft = request(serde_json::json!({
            "title": " Drive ",
            "content": "Acme on campus",
            "expiresAt": ""
        }))
        .into_draft(None, now())
        .unwrap();

        assert_eq!(draft.title, "Drive");
        assert_eq!(draft.kind, AnnouncementKind::General);
        assert_eq!(draft.priority, Priority::Medium);
        assert_eq!(draft.published_at, now());
        assert_eq!(draft.expires_at, None);
        assert!(draft.is_active);
    }

    #[test]
    fn title_and_content_are_required() {
        let err = request(serde_json::json!({ "title": "x" }))
            .into_draft(None, now())
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "Title and content are required"));
    }

    #[test]
    fn parses_kind_priority_and_dates() {
        let draft = request(serde_json::json!({
            "title": "t",
            "content": "c",
            "type": "Placement",
            "priority": "urgent",
            "expiresAt": "2025-02-01"
        }))
        .into_draft(None, now())
        .unwrap();
        assert_eq!(draft.kind, AnnouncementKind::Placement);
        assert_eq!(draft.priority, Priority::Urgent);
        assert_eq!(
            draft.expires_at,
            Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap())
        );

        assert!(request(serde_json::json!({ "title": "t", "content": "c", "priority": "asap" }))
            .into_draft(None, now())
            .is_err());
    }

    #[test]
    fn update_keeps_absent_fields() {
        let existing = Announcement {
            id: "a1".into(),
            title: "Old".into(),
            content: "Body".into(),
            kind: AnnouncementKind::Important,
            priority: Priority::High,
            published_at: now(),
            expires_at: Some(now()),
            is_active: false,
            created_by: None,
            created_at: now(),
            updated_at: now(),
        };
        let draft = request(serde_json::json!({ "title": "New" }))
            .into_draft(Some(&existing), now())
            .unwrap();
        assert_eq!(draft.title, "New");
        assert_eq!(draft.content, "Body");
        assert_eq!(draft.kind, AnnouncementKind::Important);
        assert_eq!(draft.priority, Priority::High);
        assert_eq!(draft.expires_at, Some(now()));
        assert!(!draft.is_active);
    }
}
