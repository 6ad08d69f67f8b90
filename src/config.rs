//! Process configuration parsed from environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! `main` loads an optional `.env` file, then builds one `AppConfig` before
//! any listener is bound. The protected-route prefixes are parsed here once
//! and handed to the shared `AccessPolicy`, so both auth enforcement points
//! read a single list.

use std::path::PathBuf;

use url::Url;

use crate::auth::policy::DEFAULT_PROTECTED_PREFIXES;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PUBLIC_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_SESSION_TTL_HOURS: i32 = 720;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

// =============================================================================
// CONFIG
// =============================================================================

/// Credentials for the transactional email provider used by code login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfig {
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    /// Scheme + host (+ port) the storefront is reachable at. Resumption URLs
    /// are built against it and callback URLs are only honored on it.
    pub public_origin: Url,
    pub login_path: String,
    pub protected_prefixes: Vec<String>,
    pub cookie_secure: bool,
    pub session_ttl_hours: i32,
    pub db_max_connections: u32,
    pub static_dir: PathBuf,
    /// `None` disables email code login.
    pub email: Option<EmailConfig>,
}

impl AppConfig {
    /// Build config from the process environment.
    ///
    /// Required:
    /// - `DATABASE_URL`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `PUBLIC_ORIGIN`: default `http://localhost:3000`
    /// - `LOGIN_PATH`: default `/login`
    /// - `PROTECTED_PREFIXES`: comma-separated, default `/dashboard,/me,/reviews`
    /// - `COOKIE_SECURE`: inferred from an `https://` origin when unset
    /// - `SESSION_TTL_HOURS`: default 720
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `STATIC_DIR`: default `<crate>/static`
    /// - `RESEND_API_KEY` + `RESEND_FROM`: both required to enable email login
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?;
        let public_origin = parse_origin(lookup("PUBLIC_ORIGIN").as_deref())?;
        let login_path = parse_login_path(lookup("LOGIN_PATH").as_deref())?;
        let protected_prefixes = match lookup("PROTECTED_PREFIXES") {
            Some(raw) => parse_prefixes(&raw)?,
            None => DEFAULT_PROTECTED_PREFIXES.iter().map(|p| (*p).to_owned()).collect(),
        };

        let cookie_secure = match lookup("COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid { key: "COOKIE_SECURE", value: raw })?,
            None => public_origin.scheme() == "https",
        };

        let session_ttl_hours = parse_or("SESSION_TTL_HOURS", lookup("SESSION_TTL_HOURS"), DEFAULT_SESSION_TTL_HOURS)?;
        if session_ttl_hours <= 0 {
            return Err(ConfigError::Invalid { key: "SESSION_TTL_HOURS", value: session_ttl_hours.to_string() });
        }
        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", lookup("DB_MAX_CONNECTIONS"), DEFAULT_DB_MAX_CONNECTIONS)?;

        let static_dir = lookup("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static"));

        let email = match (lookup("RESEND_API_KEY"), lookup("RESEND_FROM")) {
            (Some(api_key), Some(from)) if !api_key.is_empty() && !from.is_empty() => Some(EmailConfig { api_key, from }),
            _ => None,
        };

        Ok(Self {
            database_url,
            port,
            public_origin,
            login_path,
            protected_prefixes,
            cookie_secure,
            session_ttl_hours,
            db_max_connections,
            static_dir,
            email,
        })
    }
}

// =============================================================================
// PARSERS
// =============================================================================

/// Parse the usual truthy/falsy spellings. Case and surrounding whitespace are ignored.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match raw {
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(_) => Err(ConfigError::Invalid { key, value }),
        },
        None => Ok(default),
    }
}

fn parse_origin(raw: Option<&str>) -> Result<Url, ConfigError> {
    let value = raw.unwrap_or(DEFAULT_PUBLIC_ORIGIN).trim();
    let invalid = || ConfigError::Invalid { key: "PUBLIC_ORIGIN", value: value.to_owned() };

    let url = Url::parse(value).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    // Keep only the origin; a configured path would skew resumption URLs.
    Url::parse(&url.origin().ascii_serialization()).map_err(|_| invalid())
}

fn parse_login_path(raw: Option<&str>) -> Result<String, ConfigError> {
    let value = raw.unwrap_or(DEFAULT_LOGIN_PATH).trim();
    if !value.starts_with('/') || value.starts_with("//") || value.contains('?') {
        return Err(ConfigError::Invalid { key: "LOGIN_PATH", value: value.to_owned() });
    }
    Ok(value.to_owned())
}

/// Parse a comma-separated prefix list. Blank entries are skipped and trailing
/// slashes are dropped so `/me/` and `/me` describe the same rule.
pub(crate) fn parse_prefixes(raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut prefixes = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let trimmed = entry.trim_end_matches('/');
        if !entry.starts_with('/') || trimmed.is_empty() || trimmed.contains(['?', '#']) {
            return Err(ConfigError::Invalid { key: "PROTECTED_PREFIXES", value: entry.to_owned() });
        }
        if !prefixes.iter().any(|p| p == trimmed) {
            prefixes.push(trimmed.to_owned());
        }
    }
    Ok(prefixes)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
