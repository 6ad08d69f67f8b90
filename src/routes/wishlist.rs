//! Wishlist membership routes.
//!
//! Add and remove answer with the `AddResponse` / `RemoveResponse`
//! envelopes the client-side toggle expects.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use crate::client::membership::{AddResponse, RemoveResponse};
use crate::services::wishlist::{self, Removal, WishlistError, WishlistItem};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddWishlistBody {
    pub product_id: String,
}

/// `GET /api/wishlist`: list the caller's wishlist.
pub async fn list_items(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<WishlistItem>>, StatusCode> {
    let items = wishlist::list_items(&state.pool, auth.session.user.id)
        .await
        .map_err(wishlist_error_to_status)?;
    Ok(Json(items))
}

/// `POST /api/wishlist`: add a product; idempotent per product.
pub async fn add_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<AddWishlistBody>,
) -> Result<Json<AddResponse<Uuid>>, StatusCode> {
    let item = wishlist::add_item(&state.pool, auth.session.user.id, &body.product_id)
        .await
        .map_err(wishlist_error_to_status)?;
    Ok(Json(AddResponse::added(item.id)))
}

/// `DELETE /api/wishlist/:id`: remove one of the caller's items.
///
/// An id that is already gone still answers `{success: true}`, so a retried
/// or duplicated remove leaves the client agreeing with the server.
pub async fn remove_item(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(item_id): Path<Uuid>,
) -> Result<Json<RemoveResponse>, StatusCode> {
    let removal = wishlist::remove_item(&state.pool, auth.session.user.id, item_id)
        .await
        .map_err(wishlist_error_to_status)?;
    Ok(Json(remove_response(item_id, removal)))
}

pub(crate) fn remove_response(item_id: Uuid, removal: Removal) -> RemoveResponse {
    if removal == Removal::AlreadyGone {
        tracing::debug!(%item_id, "wishlist item already removed");
    }
    RemoveResponse { success: true }
}

pub(crate) fn wishlist_error_to_status(err: WishlistError) -> StatusCode {
    match err {
        WishlistError::InvalidProduct => StatusCode::BAD_REQUEST,
        WishlistError::Db(e) => {
            tracing::error!(error = %e, "wishlist database error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "wishlist_test.rs"]
mod tests;
