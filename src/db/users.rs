use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use serde::Serialize;

use crate::db::models::{Profile, Role, User};
use crate::db::{new_id, RepositoryError};
use crate::state::DbPool;

const USER_COLUMNS: &str = "id, name, username, email, password_hash, role, branch, \
     graduation_year, current_company, bio, linkedin, github, twitter, is_alumni, \
     created_at, updated_at";

/// Everything needed to insert a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub branch: Option<String>,
    pub graduation_year: Option<i32>,
    pub is_alumni: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub branch: Option<String>,
    pub graduation_year: Option<i32>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserFilterOptions {
    pub branches: Vec<String>,
    pub years: Vec<i32>,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserCounts {
    pub total: i64,
    pub students: i64,
    pub alumni: i64,
    pub admins: i64,
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        username: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        role: row.get(5)?,
        branch: row.get(6)?,
        graduation_year: row.get(7)?,
        current_company: row.get(8)?,
        profile: Profile {
            bio: row.get(9)?,
            linkedin: row.get(10)?,
            github: row.get(11)?,
            twitter: row.get(12)?,
        },
        is_alumni: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

/// Translate unique-index violations into user-facing conflicts.
fn map_unique_violation(err: rusqlite::Error) -> RepositoryError {
    if let rusqlite::Error::SqliteFailure(ref failure, Some(ref msg)) = err {
        if failure.code == rusqlite::ErrorCode::ConstraintViolation {
            if msg.contains("users.username") {
                return RepositoryError::Conflict("This username is already taken".into());
            }
            if msg.contains("users.email") {
                return RepositoryError::Conflict("User already exists with this email".into());
            }
        }
    }
    err.into()
}

pub fn create(pool: &DbPool, new_user: NewUser) -> Result<User, RepositoryError> {
    let conn = pool.get()?;
    let id = new_id();
    let now = Utc::now();

    conn.execute(
        "INSERT INTO users (id, name, username, email, password_hash, role, branch,
                            graduation_year, is_alumni, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            id,
            new_user.name,
            new_user.username,
            new_user.email,
            new_user.password_hash,
            new_user.role,
            new_user.branch,
            new_user.graduation_year,
            new_user.is_alumni,
            now,
        ],
    )
    .map_err(map_unique_violation)?;

    Ok(User {
        id,
        name: new_user.name,
        username: new_user.username,
        email: new_user.email,
        password_hash: new_user.password_hash,
        role: new_user.role,
        branch: new_user.branch,
        graduation_year: new_user.graduation_year,
        current_company: None,
        profile: Profile::default(),
        is_alumni: new_user.is_alumni,
        created_at: now,
        updated_at: now,
    })
}

pub fn find_by_id(pool: &DbPool, id: &str) -> Result<Option<User>, RepositoryError> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_username(pool: &DbPool, username: &str) -> Result<Option<User>, RepositoryError> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
            params![username.to_lowercase()],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, RepositoryError> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
            params![email.to_lowercase()],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// Login lookup: the identifier may be either a username or an email.
pub fn find_by_identifier(
    pool: &DbPool,
    identifier: &str,
) -> Result<Option<User>, RepositoryError> {
    let conn = pool.get()?;
    let needle = identifier.trim().to_lowercase();
    let user = conn
        .query_row(
            &format!(
                "SELECT {} FROM users WHERE email = ?1 OR username = ?1 LIMIT 1",
                USER_COLUMNS
            ),
            params![needle],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// Persist the editable profile fields of `user`.
pub fn update_profile(pool: &DbPool, user: &User) -> Result<User, RepositoryError> {
    let conn = pool.get()?;
    let now = Utc::now();
    let rows = conn.execute(
        "UPDATE users SET name = ?2, branch = ?3, graduation_year = ?4, current_company = ?5,
                bio = ?6, linkedin = ?7, github = ?8, twitter = ?9, is_alumni = ?10,
                role = ?11, updated_at = ?12
         WHERE id = ?1",
        params![
            user.id,
            user.name,
            user.branch,
            user.graduation_year,
            user.current_company,
            user.profile.bio,
            user.profile.linkedin,
            user.profile.github,
            user.profile.twitter,
            user.is_alumni,
            user.role,
            now,
        ],
    )?;
    if rows == 0 {
        return Err(RepositoryError::NotFound("User".into()));
    }

    let mut updated = user.clone();
    updated.updated_at = now;
    Ok(updated)
}

pub fn set_password_hash(
    pool: &DbPool,
    user_id: &str,
    password_hash: &str,
) -> Result<(), RepositoryError> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
        params![user_id, password_hash, Utc::now()],
    )?;
    if rows == 0 {
        return Err(RepositoryError::NotFound("User".into()));
    }
    Ok(())
}

pub fn set_role(pool: &DbPool, user_id: &str, role: Role) -> Result<(), RepositoryError> {
    let conn = pool.get()?;
    let rows = conn.execute(
        "UPDATE users SET role = ?2, updated_at = ?3 WHERE id = ?1",
        params![user_id, role, Utc::now()],
    )?;
    if rows == 0 {
        return Err(RepositoryError::NotFound("User".into()));
    }
    Ok(())
}

pub fn list(pool: &DbPool, filter: &UserFilter) -> Result<Vec<User>, RepositoryError> {
    let conn = pool.get()?;

    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(role) = filter.role {
        clauses.push("role = ?");
        values.push(Value::Text(role.as_str().to_string()));
    }
    if let Some(ref branch) = filter.branch {
        clauses.push("branch = ?");
        values.push(Value::Text(branch.clone()));
    }
    if let Some(year) = filter.graduation_year {
        clauses.push("graduation_year = ?");
        values.push(Value::Integer(year as i64));
    }
    if let Some(ref search) = filter.search {
        clauses.push("(name LIKE ? OR username LIKE ? OR email LIKE ?)");
        let pattern = format!("%{}%", search);
        for _ in 0..3 {
            values.push(Value::Text(pattern.clone()));
        }
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {} FROM users {} ORDER BY created_at DESC, id DESC",
        USER_COLUMNS, where_clause
    );

    let mut stmt = conn.prepare(&sql)?;
    let users = stmt
        .query_map(params_from_iter(values), user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub fn filter_options(pool: &DbPool) -> Result<UserFilterOptions, RepositoryError> {
    let conn = pool.get()?;

    let branches = conn
        .prepare(
            "SELECT DISTINCT branch FROM users WHERE branch IS NOT NULL AND branch != ''
             ORDER BY branch",
        )?
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    let years = conn
        .prepare(
            "SELECT DISTINCT graduation_year FROM users WHERE graduation_year IS NOT NULL
             ORDER BY graduation_year DESC",
        )?
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<i32>, _>>()?;

    Ok(UserFilterOptions {
        branches,
        years,
        roles: Role::ALL.to_vec(),
    })
}

pub fn counts(pool: &DbPool) -> Result<UserCounts, RepositoryError> {
    let conn = pool.get()?;
    let counts = conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(role = 'student'), 0),
                COALESCE(SUM(role = 'alumni'), 0),
                COALESCE(SUM(role = 'admin'), 0)
         FROM users",
        [],
        |row| {
            Ok(UserCounts {
                total: row.get(0)?,
                students: row.get(1)?,
                alumni: row.get(2)?,
                admins: row.get(3)?,
            })
        },
    )?;
    Ok(counts)
}
