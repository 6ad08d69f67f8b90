//! Account page data.
//!
//! Markup is the frontend's job. These handlers sit behind the page-level
//! authorization check and return what an account page needs to render.

use axum::Router;
use axum::http::Uri;
use axum::response::Json;
use axum::routing::get;
use serde::Serialize;

use super::auth::PageSession;
use crate::auth::policy::DEFAULT_PROTECTED_PREFIXES;
use crate::services::session::SessionUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PagePayload {
    pub path: String,
    pub user: Option<SessionUser>,
}

pub async fn account_page(PageSession(session): PageSession, uri: Uri) -> Json<PagePayload> {
    Json(PagePayload { path: uri.path().to_owned(), user: session.map(|s| s.user) })
}

/// One page per default protected root, each with any subpath.
pub fn routes() -> Router<AppState> {
    DEFAULT_PROTECTED_PREFIXES
        .iter()
        .fold(Router::new(), |router, root| {
            router
                .route(*root, get(account_page))
                .route(&format!("{root}/{{*rest}}"), get(account_page))
        })
}
