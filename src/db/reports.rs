use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::db::models::{Report, ReportReason, ReportStatus, ReportedExperience};
use crate::db::{new_id, RepositoryError};
use crate::state::DbPool;

const REPORT_SELECT: &str = "SELECT r.id, r.reporter_id, r.reason, r.description, r.status, \
     r.admin_notes, r.reviewed_by, r.reviewed_at, r.created_at, \
     e.id, e.company, e.role, e.offer_status \
     FROM reports r JOIN experiences e ON e.id = r.experience_id";

#[derive(Debug, Clone)]
pub struct NewReport {
    pub experience_id: String,
    pub reporter_id: String,
    pub reason: ReportReason,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct ReportReview {
    pub status: ReportStatus,
    pub admin_notes: Option<String>,
    pub reviewer_id: String,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportCounts {
    pub total: i64,
    pub pending: i64,
}

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: row.get(0)?,
        reporter_id: row.get(1)?,
        reason: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        admin_notes: row.get(5)?,
        reviewed_by: row.get(6)?,
        reviewed_at: row.get(7)?,
        created_at: row.get(8)?,
        experience: ReportedExperience {
            id: row.get(9)?,
            company: row.get(10)?,
            role: row.get(11)?,
            offer_status: row.get(12)?,
        },
    })
}

fn fetch(conn: &rusqlite::Connection, id: &str) -> Result<Option<Report>, RepositoryError> {
    let report = conn
        .query_row(
            &format!("{} WHERE r.id = ?1", REPORT_SELECT),
            params![id],
            report_from_row,
        )
        .optional()?;
    Ok(report)
}

pub fn create(pool: &DbPool, new_report: NewReport) -> Result<Report, RepositoryError> {
    let conn = pool.get()?;
    let id = new_id();

    conn.execute(
        "INSERT INTO reports (id, experience_id, reporter_id, reason, description, status,
                              created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
        params![
            id,
            new_report.experience_id,
            new_report.reporter_id,
            new_report.reason,
            new_report.description,
            Utc::now(),
        ],
    )?;

    fetch(&conn, &id)?.ok_or_else(|| RepositoryError::NotFound("Report".into()))
}

/// Reports newest first, optionally restricted to one status.
pub fn list(pool: &DbPool, status: Option<ReportStatus>) -> Result<Vec<Report>, RepositoryError> {
    let conn = pool.get()?;
    let reports = match status {
        Some(status) => conn
            .prepare(&format!(
                "{} WHERE r.status = ?1 ORDER BY r.created_at DESC, r.id DESC",
                REPORT_SELECT
            ))?
            .query_map(params![status], report_from_row)?
            .collect::<Result<Vec<_>, _>>()?,
        None => conn
            .prepare(&format!(
                "{} ORDER BY r.created_at DESC, r.id DESC",
                REPORT_SELECT
            ))?
            .query_map([], report_from_row)?
            .collect::<Result<Vec<_>, _>>()?,
    };
    Ok(reports)
}

pub fn review(pool: &DbPool, id: &str, review: &ReportReview) -> Result<Report, RepositoryError> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE reports SET status = ?2, admin_notes = ?3, reviewed_by = ?4, reviewed_at = ?5
         WHERE id = ?1",
        params![
            id,
            review.status,
            review.admin_notes,
            review.reviewer_id,
            review.reviewed_at,
        ],
    )?;
    if rows == 0 {
        return Err(RepositoryError::NotFound("Report".into()));
    }
    fetch(&conn, id)?.ok_or_else(|| RepositoryError::NotFound("Report".into()))
}

pub fn counts(pool: &DbPool) -> Result<ReportCounts, RepositoryError> {
    let conn = pool.get()?;
    let counts = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(status = 'pending'), 0) FROM reports",
        [],
        |row| {
            Ok(ReportCounts {
                total: row.get(0)?,
                pending: row.get(1)?,
            })
        },
    )?;
    Ok(counts)
}
