//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the auth, wishlist and account-page endpoints plus static assets
//! under one Axum router. The edge gate is layered over everything, so it
//! sees each request before any handler; static trees skip it inside the
//! middleware itself.

pub mod auth;
pub mod gate;
pub mod pages;
pub mod wishlist;

use std::path::Path;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{delete, get, post};
use tower_http::compression::CompressionLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full storefront router. `static_dir` holds `assets/`, `pkg/` and `favicon.ico`.
pub fn app(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/login", get(auth::login_page))
        .route("/api/auth/login/request-code", post(auth::request_login_code))
        .route("/api/auth/login/verify-code", post(auth::verify_login_code))
        .route("/api/auth/session", get(auth::current_session))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/wishlist", get(wishlist::list_items).post(wishlist::add_item))
        .route("/api/wishlist/{id}", delete(wishlist::remove_item))
        .merge(pages::routes())
        .nest_service("/assets", ServeDir::new(static_dir.join("assets")))
        .nest_service("/pkg", ServeDir::new(static_dir.join("pkg")))
        .route_service("/favicon.ico", ServeFile::new(static_dir.join("favicon.ico")))
        .layer(middleware::from_fn_with_state(state.clone(), gate::edge_gate))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// TEST SUPPORT
// =============================================================================


#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
