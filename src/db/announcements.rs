use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use crate::db::models::{Announcement, AnnouncementKind, Priority};
use crate::db::{new_id, RepositoryError};
use crate::state::DbPool;

const ANNOUNCEMENT_COLUMNS: &str = "id, title, content, kind, priority, published_at, \
     expires_at, is_active, created_by, created_at, updated_at";

/// Validated announcement fields, shared by create and update.
#[derive(Debug, Clone)]
pub struct AnnouncementDraft {
    pub title: String,
    pub content: String,
    pub kind: AnnouncementKind,
    pub priority: Priority,
    pub published_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnnouncementCounts {
    pub total: i64,
    pub active: i64,
}

fn announcement_from_row(row: &Row<'_>) -> rusqlite::Result<Announcement> {
    Ok(Announcement {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        kind: row.get(3)?,
        priority: row.get(4)?,
        published_at: row.get(5)?,
        expires_at: row.get(6)?,
        is_active: row.get(7)?,
        created_by: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn fetch(conn: &rusqlite::Connection, id: &str) -> Result<Option<Announcement>, RepositoryError> {
    let announcement = conn
        .query_row(
            &format!(
                "SELECT {} FROM announcements WHERE id = ?1",
                ANNOUNCEMENT_COLUMNS
            ),
            params![id],
            announcement_from_row,
        )
        .optional()?;
    Ok(announcement)
}

pub fn create(
    pool: &DbPool,
    draft: &AnnouncementDraft,
    created_by: &str,
) -> Result<Announcement, RepositoryError> {
    let conn = pool.get()?;
    let id = new_id();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO announcements (id, title, content, kind, priority, published_at, expires_at,
                                    is_active, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            id,
            draft.title,
            draft.content,
            draft.kind,
            draft.priority,
            draft.published_at,
            draft.expires_at,
            draft.is_active,
            created_by,
            now,
        ],
    )?;

    fetch(&conn, &id)?.ok_or_else(|| RepositoryError::NotFound("Announcement".into()))
}

pub fn update(
    pool: &DbPool,
    id: &str,
    draft: &AnnouncementDraft,
) -> Result<Announcement, RepositoryError> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE announcements SET title = ?2, content = ?3, kind = ?4, priority = ?5,
                published_at = ?6, expires_at = ?7, is_active = ?8, updated_at = ?9
         WHERE id = ?1",
        params![
            id,
            draft.title,
            draft.content,
            draft.kind,
            draft.priority,
            draft.published_at,
            draft.expires_at,
            draft.is_active,
            Utc::now(),
        ],
    )?;
    if rows == 0 {
        return Err(RepositoryError::NotFound("Announcement".into()));
    }
    fetch(&conn, id)?.ok_or_else(|| RepositoryError::NotFound("Announcement".into()))
}

pub fn find_by_id(pool: &DbPool, id: &str) -> Result<Option<Announcement>, RepositoryError> {
    let conn = pool.get()?;
    fetch(&conn, id)
}

pub fn delete(pool: &DbPool, id: &str) -> Result<bool, RepositoryError> {
    let conn = pool.get()?;
    let rows = conn.execute("DELETE FROM announcements WHERE id = ?1", params![id])?;
    Ok(rows > 0)
}

/// Every announcement, newest first.
pub fn list_all(pool: &DbPool) -> Result<Vec<Announcement>, RepositoryError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM announcements ORDER BY created_at DESC, id DESC",
        ANNOUNCEMENT_COLUMNS
    ))?;
    let announcements = stmt
        .query_map([], announcement_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(announcements)
}

/// Announcements visible at `now`: highest priority first, then most recently published.
pub fn list_live(pool: &DbPool, now: DateTime<Utc>) -> Result<Vec<Announcement>, RepositoryError> {
    let mut live: Vec<Announcement> = list_all(pool)?
        .into_iter()
        .filter(|a| a.is_live(now))
        .collect();
    live.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.published_at.cmp(&a.published_at))
    });
    Ok(live)
}

pub fn counts(pool: &DbPool, now: DateTime<Utc>) -> Result<AnnouncementCounts, RepositoryError> {
    let all = list_all(pool)?;
    Ok(AnnouncementCounts {
        total: all.len() as i64,
        active: all.iter().filter(|a| a.is_live(now)).count() as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::migrated_pool;
    use chrono::Duration;

    fn seed_admin(pool: &DbPool) -> String {
        let now = Utc::now();
        pool.get()
            .unwrap()
            .execute(
                "INSERT INTO users (id, name, username, email, password_hash, role, created_at, updated_at)
                 VALUES ('a1', 'Admin', 'admin', 'admin@marwadiuniversity.ac.in', 'x', 'admin', ?1, ?1)",
                params![now],
            )
            .unwrap();
        "a1".into()
    }

    fn draft(title: &str, priority: Priority) -> AnnouncementDraft {
        AnnouncementDraft {
            title: title.into(),
            content: "Details".into(),
            kind: AnnouncementKind::Placement,
            priority,
            published_at: Utc::now(),
            expires_at: None,
            is_active: true,
        }
    }

    #[test]
    fn live_announcements_sorted_by_priority() {
        let (pool, _tmp) = migrated_pool();
        let admin = seed_admin(&pool);

        create(&pool, &draft("Low", Priority::Low), &admin).unwrap();
        create(&pool, &draft("Urgent", Priority::Urgent), &admin).unwrap();
        create(&pool, &draft("Medium", Priority::Medium), &admin).unwrap();

        let mut expired = draft("Expired", Priority::Urgent);
        expired.expires_at = Some(Utc::now() - Duration::hours(1));
        create(&pool, &expired, &admin).unwrap();

        let mut inactive = draft("Inactive", Priority::High);
        inactive.is_active = false;
        create(&pool, &inactive, &admin).unwrap();

        let titles: Vec<String> = list_live(&pool, Utc::now())
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["Urgent", "Medium", "Low"]);

        let counts = counts(&pool, Utc::now()).unwrap();
        assert_eq!(counts.total, 5);
        assert_eq!(counts.active, 3);
    }

    #[test]
    fn update_and_delete() {
        let (pool, _tmp) = migrated_pool();
        let admin = seed_admin(&pool);
        let created = create(&pool, &draft("Drive", Priority::Medium), &admin).unwrap();

        let mut changed = draft("Drive moved", Priority::High);
        changed.kind = AnnouncementKind::Important;
        let updated = update(&pool, &created.id, &changed).unwrap();
        assert_eq!(updated.title, "Drive moved");
        assert_eq!(updated.kind, AnnouncementKind::Important);

        assert!(delete(&pool, &created.id).unwrap());
        assert!(find_by_id(&pool, &created.id).unwrap().is_none());
        assert!(matches!(
            update(&pool, &created.id, &changed),
            Err(RepositoryError::NotFound(_))
        ));
    }
}
