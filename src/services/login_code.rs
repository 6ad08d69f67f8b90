//! Email one-time-code login.
//!
//! A shopper asks for a code, receives it by email, and trades it for a
//! session. Codes are six characters from an alphabet without look-alikes,
//! stored only as SHA-256 hashes, and die after ten minutes, one successful
//! use, or five wrong guesses.

use rand::Rng;
use resend_rs::Resend;
use resend_rs::types::CreateEmailBaseOptions;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::session::bytes_to_hex;
use crate::config::EmailConfig;

const CODE_LEN: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_TTL_MINUTES: i32 = 10;
const MAX_FAILED_ATTEMPTS: i32 = 5;
const LOGIN_CODE_TEMPLATE: &str = include_str!("../../templates/login_code.html");

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("invalid email")]
    InvalidEmail,
    #[error("invalid code")]
    InvalidCode,
    #[error("expired or incorrect code")]
    VerificationFailed,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("email delivery failed: {0}")]
    EmailDelivery(String),
}

/// A freshly issued code, before delivery.
#[derive(Debug)]
pub struct IssuedCode {
    pub id: Uuid,
    pub email: String,
    pub code: String,
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || normalized.contains(char::is_whitespace) {
        return None;
    }
    Some(normalized)
}

#[must_use]
pub fn normalize_code(code: &str) -> Option<String> {
    let normalized = code.trim().to_ascii_uppercase();
    if normalized.len() != CODE_LEN || !normalized.bytes().all(|b| CODE_ALPHABET.contains(&b)) {
        return None;
    }
    Some(normalized)
}

#[must_use]
pub fn generate_login_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect()
}

#[must_use]
pub fn hash_login_code(code: &str) -> String {
    bytes_to_hex(&Sha256::digest(code.as_bytes()))
}

fn name_from_email(email: &str) -> &str {
    email
        .split('@')
        .next()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("shopper")
}

/// Ensure a user exists for `email`, drop any unused codes and issue a new one.
pub async fn issue_login_code(pool: &PgPool, email: &str) -> Result<IssuedCode, LoginError> {
    let email = normalize_email(email).ok_or(LoginError::InvalidEmail)?;

    sqlx::query(
        r"INSERT INTO users (email, name)
          VALUES ($1, $2)
          ON CONFLICT (email) DO NOTHING",
    )
    .bind(&email)
    .bind(name_from_email(&email))
    .execute(pool)
    .await?;

    sqlx::query("DELETE FROM login_codes WHERE email = $1 AND consumed_at IS NULL")
        .bind(&email)
        .execute(pool)
        .await?;

    let code = generate_login_code();
    let row = sqlx::query(
        r"INSERT INTO login_codes (email, code_hash, expires_at)
          VALUES ($1, $2, now() + make_interval(mins => $3))
          RETURNING id",
    )
    .bind(&email)
    .bind(hash_login_code(&code))
    .bind(CODE_TTL_MINUTES)
    .fetch_one(pool)
    .await?;

    Ok(IssuedCode { id: row.get("id"), email, code })
}

/// Remove a code that could not be delivered.
pub async fn discard_login_code(pool: &PgPool, id: Uuid) -> Result<(), LoginError> {
    sqlx::query("DELETE FROM login_codes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Consume a matching code and return the user it logs in.
pub async fn verify_login_code(pool: &PgPool, email: &str, code: &str) -> Result<Uuid, LoginError> {
    let email = normalize_email(email).ok_or(LoginError::InvalidEmail)?;
    let code = normalize_code(code).ok_or(LoginError::InvalidCode)?;

    let consumed = sqlx::query(
        r"UPDATE login_codes
          SET consumed_at = now()
          WHERE id = (
              SELECT id FROM login_codes
              WHERE email = $1 AND consumed_at IS NULL AND expires_at > now()
              ORDER BY created_at DESC
              LIMIT 1
          )
          AND code_hash = $2
          RETURNING id",
    )
    .bind(&email)
    .bind(hash_login_code(&code))
    .fetch_optional(pool)
    .await?;

    if consumed.is_none() {
        sqlx::query(
            r"UPDATE login_codes
              SET attempts = attempts + 1,
                  consumed_at = CASE WHEN attempts + 1 >= $2 THEN now() ELSE consumed_at END
              WHERE id = (
                  SELECT id FROM login_codes
                  WHERE email = $1 AND consumed_at IS NULL AND expires_at > now()
                  ORDER BY created_at DESC
                  LIMIT 1
              )",
        )
        .bind(&email)
        .bind(MAX_FAILED_ATTEMPTS)
        .execute(pool)
        .await?;
        return Err(LoginError::VerificationFailed);
    }

    let user = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?
        .ok_or(LoginError::VerificationFailed)?;

    Ok(user.get("id"))
}

pub async fn send_login_code_email(config: &EmailConfig, to_email: &str, code: &str) -> Result<(), LoginError> {
    let resend = Resend::new(&config.api_key);
    let html = render_login_code_template(to_email, code);
    let email = CreateEmailBaseOptions::new(&config.from, [to_email], "Your sign-in code").with_html(&html);

    resend
        .emails
        .send(email)
        .await
        .map_err(|e| LoginError::EmailDelivery(e.to_string()))?;
    Ok(())
}

#[must_use]
pub fn render_login_code_template(email: &str, code: &str) -> String {
    LOGIN_CODE_TEMPLATE
        .replace("{{EMAIL}}", email)
        .replace("{{CODE}}", code)
        .replace("{{TTL_MINUTES}}", &CODE_TTL_MINUTES.to_string())
}

#[cfg(test)]
#[path = "login_code_test.rs"]
mod tests;
