//! Credential Store: accounts and their role sets.

use sqlx::{FromRow, SqlitePool};
use tracing::info;

use shared::types::{Role, UserView};

use super::utils::{get_timestamp, is_unique_violation};
use crate::error::ApiError;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub roles: Vec<Role>,
}

impl User {
    /// Role names as stored, without the `ROLE_` prefix. The token service
    /// adds the prefix at issuance.
    pub fn role_names(&self) -> Vec<&'static str> {
        self.roles.iter().map(Role::as_str).collect()
    }

    pub fn to_view(&self) -> UserView {
        UserView {
            id: self.id,
            email: self.email.clone(),
            roles: self.roles.clone(),
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    let row: Option<UserRow> =
        sqlx::query_as("SELECT id, email, password_hash FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(pool)
            .await?;

    match row {
        Some(row) => Ok(Some(with_roles(pool, row).await?)),
        None => Ok(None),
    }
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    let row: Option<UserRow> =
        sqlx::query_as("SELECT id, email, password_hash FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    match row {
        Some(row) => Ok(Some(with_roles(pool, row).await?)),
        None => Ok(None),
    }
}

pub async fn exists_by_email(pool: &SqlitePool, email: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?1")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Insert the account and its roles in one transaction and assign its id.
///
/// A UNIQUE violation on the email surfaces as `AlreadyExists`, covering
/// registrations that race past the existence check.
pub async fn save(pool: &SqlitePool, new_user: NewUser) -> Result<User, ApiError> {
    let mut roles: Vec<Role> = Vec::with_capacity(new_user.roles.len());
    for role in new_user.roles {
        if !roles.contains(&role) {
            roles.push(role);
        }
    }

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO users (email, password_hash, created_at) VALUES (?1, ?2, ?3)",
    )
    .bind(&new_user.email)
    .bind(&new_user.password_hash)
    .bind(get_timestamp())
    .execute(&mut *tx)
    .await;

    let id = match inserted {
        Ok(result) => result.last_insert_rowid(),
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::AlreadyExists("User Already Exists".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    for (position, role) in roles.iter().enumerate() {
        sqlx::query("INSERT INTO user_roles (user_id, role, position) VALUES (?1, ?2, ?3)")
            .bind(id)
            .bind(role.as_str())
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    info!("New user made! id={}", id);

    Ok(User {
        id,
        email: new_user.email,
        password_hash: new_user.password_hash,
        roles,
    })
}

pub async fn load_roles(pool: &SqlitePool, user_id: i64) -> Result<Vec<Role>, sqlx::Error> {
    let names: Vec<String> =
        sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = ?1 ORDER BY position")
            .bind(user_id)
            .fetch_all(pool)
            .await?;

    names
        .iter()
        .map(|name| name.parse::<Role>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

async fn with_roles(pool: &SqlitePool, row: UserRow) -> Result<User, sqlx::Error> {
    let roles = load_roles(pool, row.id).await?;
    Ok(User {
        id: row.id,
        email: row.email,
        password_hash: row.password_hash,
        roles,
    })
}
