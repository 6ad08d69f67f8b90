//! Session lookup and lifecycle.
//!
//! ARCHITECTURE
//! ============
//! Sessions are opaque random tokens stored in Postgres and carried in an
//! HttpOnly cookie. Route code never talks to the table directly: it goes
//! through the `SessionProvider` trait held in `AppState`, which lets tests
//! swap in an in-memory store.
//!
//! FAILURE POLICY
//! ==============
//! `resolve_session` is the only entry point auth enforcement uses. A lookup
//! error is logged and reported as "no session", so a broken store denies
//! access to protected routes instead of granting it.

use std::fmt::Write;

use rand::Rng;
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

// =============================================================================
// TYPES
// =============================================================================

/// Identity attached to a live session.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    /// Display name.
    pub name: String,
    pub email: String,
}

/// Authenticated session for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Token used to authorize downstream calls. Never serialized.
    pub token: String,
    pub user: SessionUser,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// PROVIDER
// =============================================================================

#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    /// Look up a live (unexpired) session by token.
    async fn get_session(&self, token: &str) -> Result<Option<Session>, SessionError>;

    /// Create a session for `user_id`, returning its token.
    async fn create_session(&self, user_id: Uuid) -> Result<String, SessionError>;

    /// Delete a session. Unknown tokens are not an error.
    async fn delete_session(&self, token: &str) -> Result<(), SessionError>;
}

/// Resolve an optional cookie token to a session, failing closed.
pub async fn resolve_session(provider: &dyn SessionProvider, token: Option<&str>) -> Option<Session> {
    let token = token.filter(|t| !t.is_empty())?;
    match provider.get_session(token).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "session lookup failed; treating request as anonymous");
            None
        }
    }
}

// =============================================================================
// POSTGRES STORE
// =============================================================================

pub struct PgSessionStore {
    pool: PgPool,
    ttl_hours: i32,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool, ttl_hours: i32) -> Self {
        Self { pool, ttl_hours }
    }
}

#[async_trait::async_trait]
impl SessionProvider for PgSessionStore {
    async fn get_session(&self, token: &str) -> Result<Option<Session>, SessionError> {
        let row = sqlx::query(
            r"SELECT u.id, u.name, u.email
              FROM sessions s
              JOIN users u ON u.id = s.user_id
              WHERE s.token = $1 AND s.expires_at > now()",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Session {
            token: token.to_owned(),
            user: SessionUser { id: r.get("id"), name: r.get("name"), email: r.get("email") },
        }))
    }

    async fn create_session(&self, user_id: Uuid) -> Result<String, SessionError> {
        let token = generate_token();
        sqlx::query(
            "INSERT INTO sessions (token, user_id, expires_at) VALUES ($1, $2, now() + make_interval(hours => $3))",
        )
        .bind(&token)
        .bind(user_id)
        .bind(self.ttl_hours)
        .execute(&self.pool)
        .await?;
        Ok(token)
    }

    async fn delete_session(&self, token: &str) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
