// Experience store - all experience persistence goes through this repository
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::db::models::{
    AuthorSummary, Experience, ModerationStatus, OfferStatus, Round,
};
use crate::db::{new_id, RepositoryError};
use crate::moderation::ModerationDecision;
use crate::state::DbPool;

const EXPERIENCE_SELECT: &str = "SELECT e.id, e.company, e.role, e.branch, e.year, e.package, \
     e.tips, e.interview_date, e.offer_status, e.moderation_status, e.moderation_notes, \
     e.moderated_by, e.moderated_at, e.views, e.author_name, e.rounds_json, e.created_at, \
     e.updated_at, u.id, u.name, u.username, u.role, u.branch \
     FROM experiences e LEFT JOIN users u ON u.id = e.author_id";

const ORDER_NEWEST_FIRST: &str = "ORDER BY e.created_at DESC, e.id DESC";

/// A validated submission ready to be stored.
#[derive(Debug, Clone)]
pub struct NewExperience {
    pub company: String,
    pub role: String,
    pub branch: String,
    pub year: i32,
    pub package: Option<String>,
    pub tips: String,
    pub interview_date: NaiveDate,
    pub offer_status: OfferStatus,
    pub author_id: Option<String>,
    pub author_name: String,
    pub rounds: Vec<Round>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExperienceCounts {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCount {
    pub name: String,
    pub count: i64,
}

/// Repository trait - all experience database operations
#[async_trait]
pub trait ExperienceRepository: Send + Sync {
    async fn insert(&self, new: NewExperience) -> Result<Experience, RepositoryError>;

    async fn get(&self, id: &str) -> Result<Option<Experience>, RepositoryError>;

    /// Atomically bump the view counter, then return the updated record.
    async fn record_view(&self, id: &str) -> Result<Option<Experience>, RepositoryError>;

    /// All experiences, optionally restricted to one moderation status, newest first.
    async fn list(
        &self,
        status: Option<ModerationStatus>,
    ) -> Result<Vec<Experience>, RepositoryError>;

    async fn list_by_author(&self, author_id: &str) -> Result<Vec<Experience>, RepositoryError>;

    /// Persist the editable fields (not moderation, views or authorship).
    async fn update(&self, experience: &Experience) -> Result<Experience, RepositoryError>;

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError>;

    /// Store a moderation decision, provided the record is still in `expected` state.
    async fn apply_moderation(
        &self,
        id: &str,
        expected: ModerationStatus,
        decision: &ModerationDecision,
    ) -> Result<Experience, RepositoryError>;

    async fn set_company(&self, id: &str, company: &str) -> Result<Experience, RepositoryError>;

    async fn counts(&self) -> Result<ExperienceCounts, RepositoryError>;

    /// Distinct company names across all statuses with their experience counts.
    async fn company_counts(&self) -> Result<Vec<CompanyCount>, RepositoryError>;
}

/// SQLite implementation
pub struct SqliteExperienceRepository {
    pool: DbPool,
}

impl SqliteExperienceRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn fetch(
        conn: &rusqlite::Connection,
        id: &str,
    ) -> Result<Option<Experience>, RepositoryError> {
        let experience = conn
            .query_row(
                &format!("{} WHERE e.id = ?1", EXPERIENCE_SELECT),
                params![id],
                experience_from_row,
            )
            .optional()?;
        Ok(experience)
    }

    fn fetch_existing(
        conn: &rusqlite::Connection,
        id: &str,
    ) -> Result<Experience, RepositoryError> {
        Self::fetch(conn, id)?.ok_or_else(|| RepositoryError::NotFound("Experience".into()))
    }
}

fn experience_from_row(row: &Row<'_>) -> rusqlite::Result<Experience> {
    let rounds_json: String = row.get(15)?;
    let rounds: Vec<Round> = serde_json::from_str(&rounds_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(15, Type::Text, Box::new(e)))?;

    let author_id: Option<String> = row.get(18)?;
    let author = match author_id {
        Some(id) => Some(AuthorSummary {
            id,
            name: row.get(19)?,
            username: row.get(20)?,
            role: row.get(21)?,
            branch: row.get(22)?,
        }),
        None => None,
    };

    Ok(Experience {
        id: row.get(0)?,
        company: row.get(1)?,
        role: row.get(2)?,
        branch: row.get(3)?,
        year: row.get(4)?,
        package: row.get(5)?,
        tips: row.get(6)?,
        interview_date: row.get(7)?,
        offer_status: row.get(8)?,
        // Older rows may have no status at all; those count as pending
        moderation_status: row
            .get::<_, Option<ModerationStatus>>(9)?
            .unwrap_or_default(),
        moderation_notes: row.get(10)?,
        moderated_by: row.get(11)?,
        moderated_at: row.get(12)?,
        views: row.get(13)?,
        author_name: row.get(14)?,
        rounds,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
        author,
    })
}

#[async_trait]
impl ExperienceRepository for SqliteExperienceRepository {
    async fn insert(&self, new: NewExperience) -> Result<Experience, RepositoryError> {
        let conn = self.pool.get()?;
        let id = new_id();
        let now = Utc::now();
        let rounds_json = serde_json::to_string(&new.rounds)?;

        conn.execute(
            "INSERT INTO experiences (id, company, role, branch, year, package, tips,
                                      interview_date, offer_status, moderation_status, views,
                                      author_id, author_name, rounds_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'pending', 0, ?10, ?11, ?12, ?13, ?13)",
            params![
                id,
                new.company,
                new.role,
                new.branch,
                new.year,
                new.package,
                new.tips,
                new.interview_date,
                new.offer_status,
                new.author_id,
                new.author_name,
                rounds_json,
                now,
            ],
        )?;

        Self::fetch_existing(&conn, &id)
    }

    async fn get(&self, id: &str) -> Result<Option<Experience>, RepositoryError> {
        let conn = self.pool.get()?;
        Self::fetch(&conn, id)
    }

    async fn record_view(&self, id: &str) -> Result<Option<Experience>, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE experiences SET views = views + 1 WHERE id = ?1",
            params![id],
        )?;
        if rows == 0 {
            return Ok(None);
        }
        Self::fetch(&conn, id)
    }

    async fn list(
        &self,
        status: Option<ModerationStatus>,
    ) -> Result<Vec<Experience>, RepositoryError> {
        let conn = self.pool.get()?;
        let experiences = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE COALESCE(e.moderation_status, 'pending') = ?1 {}",
                    EXPERIENCE_SELECT, ORDER_NEWEST_FIRST
                ))?;
                let rows = stmt.query_map(params![status], experience_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("{} {}", EXPERIENCE_SELECT, ORDER_NEWEST_FIRST))?;
                let rows = stmt.query_map([], experience_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(experiences)
    }

    async fn list_by_author(&self, author_id: &str) -> Result<Vec<Experience>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE e.author_id = ?1 {}",
            EXPERIENCE_SELECT, ORDER_NEWEST_FIRST
        ))?;
        let experiences = stmt
            .query_map(params![author_id], experience_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(experiences)
    }

    async fn update(&self, experience: &Experience) -> Result<Experience, RepositoryError> {
        let conn = self.pool.get()?;
        let rounds_json = serde_json::to_string(&experience.rounds)?;

        let rows = conn.execute(
            "UPDATE experiences SET company = ?2, role = ?3, branch = ?4, year = ?5,
                    package = ?6, tips = ?7, interview_date = ?8, offer_status = ?9,
                    rounds_json = ?10, updated_at = ?11
             WHERE id = ?1",
            params![
                experience.id,
                experience.company,
                experience.role,
                experience.branch,
                experience.year,
                experience.package,
                experience.tips,
                experience.interview_date,
                experience.offer_status,
                rounds_json,
                Utc::now(),
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound("Experience".into()));
        }

        Self::fetch_existing(&conn, &experience.id)
    }

    async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute("DELETE FROM experiences WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    async fn apply_moderation(
        &self,
        id: &str,
        expected: ModerationStatus,
        decision: &ModerationDecision,
    ) -> Result<Experience, RepositoryError> {
        let conn = self.pool.get()?;

        // Guarded on the status the decision was computed from
        let rows = conn.execute(
            "UPDATE experiences
             SET moderation_status = ?2, moderation_notes = ?3, moderated_by = ?4,
                 moderated_at = ?5
             WHERE id = ?1 AND COALESCE(moderation_status, 'pending') = ?6",
            params![
                id,
                decision.status,
                decision.notes,
                decision.moderator_id,
                decision.decided_at,
                expected,
            ],
        )?;

        if rows == 0 {
            return match Self::fetch(&conn, id)? {
                None => Err(RepositoryError::NotFound("Experience".into())),
                Some(current) => Err(RepositoryError::Conflict(format!(
                    "Experience changed to {} while being moderated",
                    current.moderation_status
                ))),
            };
        }

        Self::fetch_existing(&conn, id)
    }

    async fn set_company(&self, id: &str, company: &str) -> Result<Experience, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE experiences SET company = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, company, Utc::now()],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound("Experience".into()));
        }
        Self::fetch_existing(&conn, id)
    }

    async fn counts(&self) -> Result<ExperienceCounts, RepositoryError> {
        let conn = self.pool.get()?;
        let counts = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(COALESCE(moderation_status, 'pending') = 'pending'), 0),
                    COALESCE(SUM(moderation_status = 'approved'), 0),
                    COALESCE(SUM(moderation_status = 'rejected'), 0)
             FROM experiences",
            [],
            |row| {
                Ok(ExperienceCounts {
                    total: row.get(0)?,
                    pending: row.get(1)?,
                    approved: row.get(2)?,
                    rejected: row.get(3)?,
                })
            },
        )?;
        Ok(counts)
    }

    async fn company_counts(&self) -> Result<Vec<CompanyCount>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT company, COUNT(*) FROM experiences GROUP BY company ORDER BY company",
        )?;
        let companies = stmt
            .query_map([], |row| {
                Ok(CompanyCount {
                    name: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(companies)
    }
}

/// Type alias for Arc-wrapped repository (for AppState)
pub type DynExperienceRepository = Arc<dyn ExperienceRepository>;
