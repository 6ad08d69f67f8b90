//! Wishlist persistence.
//!
//! One row per `(user_id, product_id)`. Adding an item that is already on
//! the list returns the existing row, so a client that repeats an add after
//! an ambiguous failure converges on the same membership id. Removing an
//! item that is already gone succeeds for the same reason.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const MAX_PRODUCT_ID_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum WishlistError {
    #[error("invalid product id")]
    InvalidProduct,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WishlistItem {
    pub id: Uuid,
    pub product_id: String,
    pub added_at: Option<String>,
}

fn item_from_row(row: &PgRow) -> WishlistItem {
    WishlistItem { id: row.get("id"), product_id: row.get("product_id"), added_at: row.get("added_at") }
}

/// Product ids come from the catalog service: short slugs or numeric ids.
#[must_use]
pub fn normalize_product_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let valid = !trimmed.is_empty()
        && trimmed.len() <= MAX_PRODUCT_ID_LEN
        && trimmed
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    valid.then(|| trimmed.to_owned())
}

pub async fn list_items(pool: &PgPool, user_id: Uuid) -> Result<Vec<WishlistItem>, WishlistError> {
    let rows = sqlx::query(
        r#"SELECT id, product_id, to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS added_at
           FROM wishlist_items
           WHERE user_id = $1
           ORDER BY created_at DESC"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(item_from_row).collect())
}

/// Add `product_id` to the user's wishlist, returning the (possibly existing) item.
pub async fn add_item(pool: &PgPool, user_id: Uuid, product_id: &str) -> Result<WishlistItem, WishlistError> {
    let product_id = normalize_product_id(product_id).ok_or(WishlistError::InvalidProduct)?;

    let row = sqlx::query(
        r#"INSERT INTO wishlist_items (user_id, product_id)
           VALUES ($1, $2)
           ON CONFLICT (user_id, product_id) DO UPDATE SET product_id = EXCLUDED.product_id
           RETURNING id, product_id, to_char(created_at, 'YYYY-MM-DD"T"HH24:MI:SS"Z"') AS added_at"#,
    )
    .bind(user_id)
    .bind(&product_id)
    .fetch_one(pool)
    .await?;

    Ok(item_from_row(&row))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    /// No row for this user and id: removed earlier, or never theirs.
    AlreadyGone,
}

impl Removal {
    #[must_use]
    pub fn from_rows_affected(rows: u64) -> Self {
        if rows == 0 { Self::AlreadyGone } else { Self::Deleted }
    }
}

/// Remove an item owned by `user_id`. Repeating the call is not an error.
pub async fn remove_item(pool: &PgPool, user_id: Uuid, item_id: Uuid) -> Result<Removal, WishlistError> {
    let result = sqlx::query("DELETE FROM wishlist_items WHERE id = $1 AND user_id = $2")
        .bind(item_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(Removal::from_rows_affected(result.rows_affected()))
}

#[cfg(test)]
#[path = "wishlist_test.rs"]
mod tests;
