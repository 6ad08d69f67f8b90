//! Auth routes and extractors: code login, session, logout, and the
//! page-level authorization check.

use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::Duration;

use super::gate::{redirect_to_login, request_target};
use crate::auth::callback::sanitize_callback_url;
use crate::auth::policy::Decision;
use crate::services::login_code::{self, LoginError};
use crate::services::session::{Session, SessionUser, resolve_session};
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

pub(crate) fn session_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(COOKIE_NAME)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
}

fn session_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn expired_session_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = session_cookie(String::new(), secure);
    cookie.set_max_age(Duration::ZERO);
    cookie
}

// =============================================================================
// EXTRACTORS
// =============================================================================

/// Session the edge gate already resolved for this request.
#[derive(Debug, Clone)]
pub struct ResolvedSession(pub Option<Session>);

async fn request_session(state: &AppState, parts: &Parts) -> Option<Session> {
    if let Some(ResolvedSession(session)) = parts.extensions.get::<ResolvedSession>() {
        return session.clone();
    }
    let token = session_token(&parts.headers);
    resolve_session(state.sessions.as_ref(), token.as_deref()).await
}

/// Authenticated user for API handlers. Rejects with `401`.
pub struct AuthUser {
    pub session: Session,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let session = request_session(&app_state, parts)
            .await
            .ok_or(StatusCode::UNAUTHORIZED)?;
        Ok(Self { session })
    }
}

/// Session if any, never rejecting. Reuses the gate's lookup when present.
pub struct MaybeSession(pub Option<Session>);

impl<S> FromRequestParts<S> for MaybeSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        Ok(Self(request_session(&app_state, parts).await))
    }
}

/// Page-level authorization check.
///
/// Consults the same `AccessPolicy` as the edge gate, so a page handler
/// taking this extractor redirects exactly when the gate would. Anonymous
/// visitors on unprotected paths get `PageSession(None)`.
pub struct PageSession(pub Option<Session>);

impl<S> FromRequestParts<S> for PageSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let session = request_session(&app_state, parts).await;
        match app_state.policy.decide(request_target(&parts.uri), session.as_ref()) {
            Decision::Allow => Ok(Self(session)),
            Decision::Redirect(intent) => Err(redirect_to_login(&intent)),
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "callbackUrl")]
    callback_url: Option<String>,
}

/// `GET /login`: login entry point.
///
/// Signed-in visitors are sent straight on to the sanitized callback; others
/// get the data the login form needs.
pub async fn login_page(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    Query(query): Query<LoginQuery>,
) -> Response {
    let callback = sanitize_callback_url(query.callback_url.as_deref(), state.policy.public_origin());

    if session.is_some() {
        return Redirect::temporary(&callback).into_response();
    }

    Json(serde_json::json!({
        "callback_url": callback,
        "email_login": state.email.is_some(),
    }))
    .into_response()
}

#[derive(Deserialize)]
pub struct RequestCodeBody {
    email: String,
}

/// `POST /api/auth/login/request-code`: issue and email a login code.
pub async fn request_login_code(
    State(state): State<AppState>,
    Json(body): Json<RequestCodeBody>,
) -> Result<StatusCode, StatusCode> {
    let Some(email_config) = &state.email else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let issued = login_code::issue_login_code(&state.pool, &body.email)
        .await
        .map_err(login_error_to_status)?;

    if let Err(e) = login_code::send_login_code_email(email_config, &issued.email, &issued.code).await {
        tracing::error!(error = %e, "login code delivery failed");
        if let Err(e) = login_code::discard_login_code(&state.pool, issued.id).await {
            tracing::warn!(error = %e, "failed to discard undelivered login code");
        }
        return Err(login_error_to_status(e));
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct VerifyCodeBody {
    email: String,
    code: String,
    #[serde(default, rename = "callbackUrl")]
    callback_url: Option<String>,
}

/// `POST /api/auth/login/verify-code`: trade a code for a session cookie.
///
/// Responds with the sanitized place to resume navigation.
pub async fn verify_login_code(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<VerifyCodeBody>,
) -> Result<Response, StatusCode> {
    let user_id = login_code::verify_login_code(&state.pool, &body.email, &body.code)
        .await
        .map_err(login_error_to_status)?;

    let token = state.sessions.create_session(user_id).await.map_err(|e| {
        tracing::error!(error = %e, "session creation failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let redirect_to = sanitize_callback_url(body.callback_url.as_deref(), state.policy.public_origin());
    let jar = jar.add(session_cookie(token, state.cookie_secure));
    Ok((jar, Json(serde_json::json!({ "redirect_to": redirect_to }))).into_response())
}

/// `GET /api/auth/session`: return the signed-in user.
pub async fn current_session(auth: AuthUser) -> Json<SessionUser> {
    Json(auth.session.user)
}

/// `POST /api/auth/logout`: delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = state.sessions.delete_session(&auth.session.token).await {
        tracing::warn!(error = %e, "session delete failed during logout");
    }

    let jar = CookieJar::new().add(expired_session_cookie(state.cookie_secure));
    (jar, StatusCode::NO_CONTENT)
}

pub(crate) fn login_error_to_status(err: LoginError) -> StatusCode {
    match err {
        LoginError::InvalidEmail | LoginError::InvalidCode => StatusCode::BAD_REQUEST,
        LoginError::VerificationFailed => StatusCode::UNAUTHORIZED,
        LoginError::EmailDelivery(_) => StatusCode::BAD_GATEWAY,
        LoginError::Db(e) => {
            tracing::error!(error = %e, "login database error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
