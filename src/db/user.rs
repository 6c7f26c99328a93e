use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;

use crate::password::verify_password;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    pub fn from_db(s: &str) -> Self {
        match s {
            "admin" => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

/// Full user record, including the password hash. Never serialized.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    password_hash: String,
}

impl User {
    pub fn verify_password(&self, candidate: &str) -> bool {
        verify_password(&self.password_hash, candidate)
    }

    /// Drop sensitive fields before the user leaves the trust boundary.
    pub fn redact(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
        }
    }
}

/// Redacted user, safe to return to clients and to cache in sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

/// Fields for a new user row; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: UserRole,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    name: String,
    password_hash: String,
    role: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            role: UserRole::from_db(&row.role),
            password_hash: row.password_hash,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PublicUserRow {
    id: String,
    email: String,
    name: String,
    role: String,
}

impl From<PublicUserRow> for PublicUser {
    fn from(row: PublicUserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            role: UserRole::from_db(&row.role),
        }
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user. Fails with a unique violation if the email is taken.
    pub async fn create(&self, record: &NewUserRecord) -> Result<PublicUser, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO users (id, email, name, password_hash, role) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&record.email)
        .bind(&record.name)
        .bind(&record.password_hash)
        .bind(record.role.as_str())
        .execute(&self.pool)
        .await?;

        Ok(PublicUser {
            id,
            email: record.email.clone(),
            name: record.name.clone(),
            role: record.role,
        })
    }

    /// Get a user by email, including the password hash.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, name, password_hash, role FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    /// Get a redacted user by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<PublicUser>, sqlx::Error> {
        let row: Option<PublicUserRow> =
            sqlx::query_as("SELECT id, email, name, role FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(PublicUser::from))
    }

    /// List all users, oldest first.
    pub async fn list_all(&self) -> Result<Vec<PublicUser>, sqlx::Error> {
        let rows: Vec<PublicUserRow> =
            sqlx::query_as("SELECT id, email, name, role FROM users ORDER BY created_at, email")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(PublicUser::from).collect())
    }

    /// Set the role for the user with this email.
    pub async fn set_role_by_email(&self, email: &str, role: UserRole) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE email = ?")
            .bind(role.as_str())
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
