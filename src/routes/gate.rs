//! Edge authorization gate.
//!
//! SYSTEM CONTEXT
//! ==============
//! Layered over the whole router, this middleware runs before any handler.
//! Static assets and the favicon pass straight through. Everything else has
//! its session resolved once (stashed in request extensions for extractors
//! further down) and is checked against the shared `AccessPolicy`.

use axum::extract::{Request, State};
use axum::http::Uri;
use axum::http::uri::PathAndQuery;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use super::auth::{ResolvedSession, session_token};
use crate::auth::policy::{Decision, RedirectIntent};
use crate::services::session::resolve_session;
use crate::state::AppState;

/// Asset trees the gate never inspects.
const STATIC_PREFIXES: &[&str] = &["/assets/", "/pkg/", "/static/"];
const FAVICON_PATH: &str = "/favicon.ico";

#[must_use]
pub fn is_static_asset(path: &str) -> bool {
    path == FAVICON_PATH || STATIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Path plus query, as the visitor requested it.
pub(crate) fn request_target(uri: &Uri) -> &str {
    uri.path_and_query()
        .map_or_else(|| uri.path(), PathAndQuery::as_str)
}

pub(crate) fn redirect_to_login(intent: &RedirectIntent) -> Response {
    tracing::debug!(callback_url = %intent.callback_url, "anonymous request to protected route");
    Redirect::temporary(&intent.location()).into_response()
}

pub async fn edge_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if is_static_asset(request.uri().path()) {
        return next.run(request).await;
    }

    let token = session_token(request.headers());
    let session = resolve_session(state.sessions.as_ref(), token.as_deref()).await;

    let decision = state.policy.decide(request_target(request.uri()), session.as_ref());
    match decision {
        Decision::Allow => {
            request.extensions_mut().insert(ResolvedSession(session));
            next.run(request).await
        }
        Decision::Redirect(intent) => redirect_to_login(&intent),
    }
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
