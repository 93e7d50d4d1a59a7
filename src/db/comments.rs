use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::models::{AuthorSummary, Comment};
use crate::db::{new_id, RepositoryError};
use crate::state::DbPool;

const COMMENT_SELECT: &str = "SELECT c.id, c.experience_id, c.content, c.created_at, \
     u.id, u.name, u.username, u.role, u.branch \
     FROM comments c JOIN users u ON u.id = c.author_id";

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        experience_id: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
        author: AuthorSummary {
            id: row.get(4)?,
            name: row.get(5)?,
            username: row.get(6)?,
            role: row.get(7)?,
            branch: row.get(8)?,
        },
    })
}

pub fn create(
    pool: &DbPool,
    experience_id: &str,
    author_id: &str,
    content: &str,
) -> Result<Comment, RepositoryError> {
    let conn = pool.get()?;
    let id = new_id();

    conn.execute(
        "INSERT INTO comments (id, experience_id, author_id, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, experience_id, author_id, content, Utc::now()],
    )?;

    conn.query_row(
        &format!("{} WHERE c.id = ?1", COMMENT_SELECT),
        params![id],
        comment_from_row,
    )
    .map_err(Into::into)
}

/// Comments on one experience, oldest first.
pub fn list_for_experience(
    pool: &DbPool,
    experience_id: &str,
) -> Result<Vec<Comment>, RepositoryError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "{} WHERE c.experience_id = ?1 ORDER BY c.created_at ASC, c.id ASC",
        COMMENT_SELECT
    ))?;
    let comments = stmt
        .query_map(params![experience_id], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

pub fn find_by_id(pool: &DbPool, id: &str) -> Result<Option<Comment>, RepositoryError> {
    let conn = pool.get()?;
    let comment = conn
        .query_row(
            &format!("{} WHERE c.id = ?1", COMMENT_SELECT),
            params![id],
            comment_from_row,
        )
        .optional()?;
    Ok(comment)
}

pub fn delete(pool: &DbPool, id: &str) -> Result<bool, RepositoryError> {
    let conn = pool.get()?;
    let rows = conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}
