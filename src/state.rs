//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers and middleware via the `State`
//! extractor. It holds the database pool, the session provider and the one
//! `AccessPolicy` both auth enforcement points consult.

use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::policy::AccessPolicy;
use crate::config::{AppConfig, EmailConfig};
use crate::services::session::{PgSessionStore, SessionProvider};

/// Clone is required by Axum; all inner fields are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub sessions: Arc<dyn SessionProvider>,
    pub policy: Arc<AccessPolicy>,
    /// `None` disables email code login.
    pub email: Option<EmailConfig>,
    pub cookie_secure: bool,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, sessions: Arc<dyn SessionProvider>, policy: AccessPolicy) -> Self {
        Self { pool, sessions, policy: Arc::new(policy), email: None, cookie_secure: false }
    }

    /// Production wiring: Postgres-backed sessions and config-driven policy.
    #[must_use]
    pub fn from_config(pool: PgPool, config: &AppConfig) -> Self {
        let sessions = Arc::new(PgSessionStore::new(pool.clone(), config.session_ttl_hours));
        let mut state = Self::new(pool, sessions, AccessPolicy::from_config(config));
        state.email = config.email.clone();
        state.cookie_secure = config.cookie_secure;
        state
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
