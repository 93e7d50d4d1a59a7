// Company name standardization table
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::models::CompanyStandardization;
use crate::db::{new_id, RepositoryError};
use crate::state::DbPool;

const STANDARDIZATION_COLUMNS: &str =
    "id, standard_name, variations_json, created_at, updated_at";

fn standardization_from_row(row: &Row<'_>) -> rusqlite::Result<CompanyStandardization> {
    let variations_json: String = row.get(2)?;
    let variations = serde_json::from_str(&variations_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    Ok(CompanyStandardization {
        id: row.get(0)?,
        standard_name: row.get(1)?,
        variations,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn map_duplicate_name(err: rusqlite::Error) -> RepositoryError {
    if let rusqlite::Error::SqliteFailure(ref failure, _) = err {
        if failure.code == rusqlite::ErrorCode::ConstraintViolation {
            return RepositoryError::Conflict(
                "A standardization for this company already exists".into(),
            );
        }
    }
    err.into()
}

fn fetch(
    conn: &rusqlite::Connection,
    id: &str,
) -> Result<Option<CompanyStandardization>, RepositoryError> {
    let standardization = conn
        .query_row(
            &format!(
                "SELECT {} FROM company_standardizations WHERE id = ?1",
                STANDARDIZATION_COLUMNS
            ),
            params![id],
            standardization_from_row,
        )
        .optional()?;
    Ok(standardization)
}

pub fn create(
    pool: &DbPool,
    standard_name: &str,
    variations: &[String],
    created_by: &str,
) -> Result<CompanyStandardization, RepositoryError> {
    let conn = pool.get()?;
    let id = new_id();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO company_standardizations (id, standard_name, variations_json, created_by,
                                               created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![
            id,
            standard_name,
            serde_json::to_string(variations)?,
            created_by,
            now
        ],
    )
    .map_err(map_duplicate_name)?;

    fetch(&conn, &id)?.ok_or_else(|| RepositoryError::NotFound("Standardization".into()))
}

pub fn update(
    pool: &DbPool,
    id: &str,
    standard_name: &str,
    variations: &[String],
) -> Result<CompanyStandardization, RepositoryError> {
    let conn = pool.get()?;
    let rows = conn
        .execute(
            "UPDATE company_standardizations
             SET standard_name = ?2, variations_json = ?3, updated_at = ?4
             WHERE id = ?1",
            params![
                id,
                standard_name,
                serde_json::to_string(variations)?,
                Utc::now()
            ],
        )
        .map_err(map_duplicate_name)?;
    if rows == 0 {
        return Err(RepositoryError::NotFound("Standardization".into()));
    }
    fetch(&conn, id)?.ok_or_else(|| RepositoryError::NotFound("Standardization".into()))
}

pub fn delete(pool: &DbPool, id: &str) -> Result<bool, RepositoryError> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "DELETE FROM company_standardizations WHERE id = ?1",
        params![id],
    )?;
    Ok(rows > 0)
}

/// All entries ordered by canonical name.
pub fn list(pool: &DbPool) -> Result<Vec<CompanyStandardization>, RepositoryError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM company_standardizations ORDER BY standard_name COLLATE NOCASE",
        STANDARDIZATION_COLUMNS
    ))?;
    let standardizations = stmt
        .query_map([], standardization_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(standardizations)
}

/// Case-insensitive lookup of a canonical name.
pub fn find_by_standard_name(
    pool: &DbPool,
    standard_name: &str,
) -> Result<Option<CompanyStandardization>, RepositoryError> {
    let conn = pool.get()?;
    let standardization = conn
        .query_row(
            &format!(
                "SELECT {} FROM company_standardizations
                 WHERE standard_name = ?1 COLLATE NOCASE",
                STANDARDIZATION_COLUMNS
            ),
            params![standard_name.trim()],
            standardization_from_row,
        )
        .optional()?;
    Ok(standardization)
}
