use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

use crate::auth::password::{Credential, HashAlgorithm};
use crate::db::models::{Role, User};
use crate::repository::{is_unique_violation, RepositoryError};
use crate::state::DbPool;

/// Emails are compared trimmed and case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub bio: String,
    pub credential: Option<Credential>,
    pub auth_provider: String,
    pub email_verified: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; a taken email is a `Conflict`.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn email_exists(&self, email: &str) -> Result<bool, RepositoryError>;

    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), RepositoryError>;

    /// Move a bio-embedded hash into the credential column and keep only the visible bio.
    async fn migrate_legacy_credential(
        &self,
        id: i64,
        credential: &Credential,
        visible_bio: &str,
    ) -> Result<(), RepositoryError>;

    async fn update_profile(&self, id: i64, update: ProfileUpdate)
        -> Result<User, RepositoryError>;
}

pub type DynUserRepository = Arc<dyn UserRepository>;

const USER_COLUMNS: &str = "id, email, first_name, last_name, role, bio, password_hash, \
     password_algorithm, auth_provider, email_verified, is_active, last_login, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let hash: Option<String> = row.get(6)?;
    let algorithm: Option<String> = row.get(7)?;
    let credential = hash.map(|hash| Credential {
        algorithm: algorithm
            .as_deref()
            .and_then(HashAlgorithm::parse)
            .unwrap_or(HashAlgorithm::Bcrypt),
        hash,
    });

    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        role: row.get(4)?,
        bio: row.get(5)?,
        credential,
        auth_provider: row.get(8)?,
        email_verified: row.get(9)?,
        is_active: row.get(10)?,
        last_login: row.get(11)?,
        created_at: row.get(12)?,
    })
}

/// SQLite implementation
pub struct SqliteUserRepository {
    pool: DbPool,
}

impl SqliteUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn load(conn: &rusqlite::Connection, id: i64) -> Result<Option<User>, RepositoryError> {
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError> {
        let conn = self.pool.get()?;
        let email = normalize_email(&user.email);
        let (hash, algorithm) = match user.credential {
            Some(ref c) => (Some(c.hash.as_str()), Some(c.algorithm.as_str())),
            None => (None, None),
        };

        let inserted = conn.execute(
            "INSERT INTO users (email, first_name, last_name, role, bio, password_hash,
                                password_algorithm, auth_provider, email_verified, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                email,
                user.first_name,
                user.last_name,
                user.role,
                user.bio,
                hash,
                algorithm,
                user.auth_provider,
                user.email_verified,
                Utc::now().to_rfc3339(),
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(ref e) if is_unique_violation(e) => {
                return Err(RepositoryError::Conflict(format!(
                    "Email {} is already registered",
                    email
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        Self::load(&conn, id)?
            .ok_or_else(|| RepositoryError::NotFound(format!("User {}", id)))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        Self::load(&conn, id)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                params![normalize_email(email)],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
            params![normalize_email(email)],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    async fn touch_last_login(&self, id: i64, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![at.to_rfc3339(), id],
        )?;
        Ok(())
    }

    async fn migrate_legacy_credential(
        &self,
        id: i64,
        credential: &Credential,
        visible_bio: &str,
    ) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        // Only migrate rows that still have no first-class credential
        conn.execute(
            "UPDATE users SET password_hash = ?1, password_algorithm = ?2, bio = ?3
             WHERE id = ?4 AND password_hash IS NULL",
            params![
                credential.hash,
                credential.algorithm.as_str(),
                visible_bio,
                id
            ],
        )?;
        Ok(())
    }

    async fn update_profile(
        &self,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE users SET
               first_name = COALESCE(?1, first_name),
               last_name = COALESCE(?2, last_name),
               bio = COALESCE(?3, bio)
             WHERE id = ?4",
            params![update.first_name, update.last_name, update.bio, id],
        )?;

        if rows == 0 {
            return Err(RepositoryError::NotFound(format!("User {}", id)));
        }

        Self::load(&conn, id)?.ok_or_else(|| RepositoryError::NotFound(format!("User {}", id)))
    }
}
