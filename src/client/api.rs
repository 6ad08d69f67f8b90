//! HTTP membership service for the storefront wishlist API.
//!
//! ERROR HANDLING
//! ==============
//! Non-2xx statuses, transport errors and bodies that do not decode all
//! surface as `MembershipError`. A `200` with an unreadable body is treated
//! as a failure; the controller rolls back and nothing is retried.

use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use serde::Serialize;
use uuid::Uuid;

use super::membership::{AddResponse, MembershipError, MembershipService, RemoveResponse};
use super::toggle::OptimisticToggle;

/// Optimistic wishlist button state for one product.
pub type WishlistToggle = OptimisticToggle<WishlistApi>;

#[derive(Serialize)]
struct AddWishlistBody<'a> {
    product_id: &'a str,
}

pub struct WishlistApi {
    http: reqwest::Client,
    base_url: String,
}

impl WishlistApi {
    /// Build a client for `base_url` that authenticates with `session_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str, session_token: &str) -> Result<Self, MembershipError> {
        let mut headers = HeaderMap::new();
        let cookie = HeaderValue::from_str(&format!("session_token={session_token}"))
            .map_err(|e| MembershipError::Transport(e.to_string()))?;
        headers.insert(COOKIE, cookie);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }
}

#[async_trait::async_trait]
impl MembershipService for WishlistApi {
    type EntityId = String;
    type MembershipId = Uuid;

    async fn add(&self, product_id: &String) -> Result<AddResponse<Uuid>, MembershipError> {
        let response = self
            .http
            .post(format!("{}/api/wishlist", self.base_url))
            .json(&AddWishlistBody { product_id })
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn remove(&self, membership_id: &Uuid) -> Result<RemoveResponse, MembershipError> {
        let response = self
            .http
            .delete(format!("{}/api/wishlist/{membership_id}", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
