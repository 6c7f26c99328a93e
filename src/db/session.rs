//! Session storage: one live session per subject, with store-enforced expiry.
//!
//! A session row is the only authority for "is this subject logged in".
//! Expired rows are invisible to `get` even before the cleanup task removes them.

use sqlx::sqlite::SqlitePool;
use sqlx::types::Json;

use super::user::PublicUser;

/// A live session.
#[derive(Debug, Clone)]
pub struct Session {
    pub subject: String,
    /// Minted per login; tokens carry it as `sid`.
    pub session_id: String,
    /// Redacted user as it was at login time.
    pub snapshot: PublicUser,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: i64,
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    subject: String,
    session_id: String,
    snapshot: Json<PublicUser>,
    expires_at: i64,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Self {
            subject: row.subject,
            session_id: row.session_id,
            snapshot: row.snapshot.0,
            expires_at: row.expires_at,
        }
    }
}

/// Store for managing live sessions.
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write or overwrite the session for `subject`. Last write wins.
    pub async fn put(
        &self,
        subject: &str,
        session_id: &str,
        snapshot: &PublicUser,
        ttl_secs: u64,
        now: u64,
    ) -> Result<(), sqlx::Error> {
        let expires_at = i64::try_from(now.saturating_add(ttl_secs)).unwrap_or(i64::MAX);
        sqlx::query(
            "INSERT INTO sessions (subject, session_id, snapshot, expires_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(subject) DO UPDATE SET
                session_id = excluded.session_id,
                snapshot = excluded.snapshot,
                expires_at = excluded.expires_at",
        )
        .bind(subject)
        .bind(session_id)
        .bind(Json(snapshot))
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get the live session for `subject`, or `None` if absent or expired.
    pub async fn get(&self, subject: &str, now: u64) -> Result<Option<Session>, sqlx::Error> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT subject, session_id, snapshot, expires_at FROM sessions WHERE subject = ? AND expires_at > ?",
        )
        .bind(subject)
        .bind(i64::try_from(now).unwrap_or(i64::MAX))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Session::from))
    }

    /// Remove the session for `subject`. Returns whether a row existed.
    pub async fn delete(&self, subject: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE subject = ?")
            .bind(subject)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all sessions that expired at or before `now`.
    pub async fn delete_expired(&self, now: u64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(i64::try_from(now).unwrap_or(i64::MAX))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, UserRole};

    const NOW: u64 = 1_705_321_845;

    fn snapshot(id: &str) -> PublicUser {
        PublicUser {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            name: id.to_string(),
            role: UserRole::User,
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let db = Database::open(":memory:").await.unwrap();
        let store = db.sessions();

        store.put("alice", "sid-1", &snapshot("alice"), 3600, NOW).await.unwrap();

        let session = store.get("alice", NOW).await.unwrap().unwrap();
        assert_eq!(session.subject, "alice");
        assert_eq!(session.session_id, "sid-1");
        assert_eq!(session.snapshot, snapshot("alice"));
        assert_eq!(session.expires_at, (NOW + 3600) as i64);

        assert!(store.get("bob", NOW).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let db = Database::open(":memory:").await.unwrap();
        let store = db.sessions();

        store.put("alice", "sid-1", &snapshot("alice"), 3600, NOW).await.unwrap();
        store.put("alice", "sid-2", &snapshot("alice"), 60, NOW).await.unwrap();

        let session = store.get("alice", NOW).await.unwrap().unwrap();
        assert_eq!(session.session_id, "sid-2");
        assert_eq!(session.expires_at, (NOW + 60) as i64);
    }

    #[tokio::test]
    async fn test_expired_session_is_invisible() {
        let db = Database::open(":memory:").await.unwrap();
        let store = db.sessions();

        store.put("alice", "sid-1", &snapshot("alice"), 60, NOW).await.unwrap();

        assert!(store.get("alice", NOW + 59).await.unwrap().is_some());
        assert!(store.get("alice", NOW + 60).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let db = Database::open(":memory:").await.unwrap();
        let store = db.sessions();

        store.put("alice", "sid-1", &snapshot("alice"), 60, NOW).await.unwrap();

        assert!(store.delete("alice").await.unwrap());
        assert!(!store.delete("alice").await.unwrap());
        assert!(store.get("alice", NOW).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let db = Database::open(":memory:").await.unwrap();
        let store = db.sessions();

        store.put("alice", "a", &snapshot("alice"), 10, NOW).await.unwrap();
        store.put("bob", "b", &snapshot("bob"), 1000, NOW).await.unwrap();

        assert_eq!(store.delete_expired(NOW + 10).await.unwrap(), 1);
        assert!(store.get("bob", NOW + 10).await.unwrap().is_some());
        assert_eq!(store.delete_expired(NOW + 10).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_huge_ttl_clamps_instead_of_wrapping() {
        let db = Database::open(":memory:").await.unwrap();
        let store = db.sessions();

        store.put("alice", "a", &snapshot("alice"), u64::MAX, NOW).await.unwrap();

        let session = store.get("alice", NOW).await.unwrap().unwrap();
        assert_eq!(session.expires_at, i64::MAX);
        assert_eq!(store.delete_expired(NOW).await.unwrap(), 0);
    }
}
