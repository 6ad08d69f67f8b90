//! Route access policy shared by every auth enforcement point.
//!
//! DESIGN
//! ======
//! A single `AccessPolicy` is built at startup and injected (behind `Arc`)
//! into both the edge middleware and the page-level extractor. Neither call
//! site owns a prefix list of its own, so the two cannot drift apart.
//!
//! MATCHING
//! ========
//! A path is protected iff it equals a prefix or starts with `prefix + "/"`.
//! Plain `starts_with` would also catch `/reviews-archive` under `/reviews`.

use url::Url;
use url::form_urlencoded;

use crate::config::AppConfig;
use crate::services::session::Session;

/// Prefixes protected when no override is configured.
pub const DEFAULT_PROTECTED_PREFIXES: &[&str] = &["/dashboard", "/me", "/reviews"];

/// Query parameter carrying the resumption URL to the login entry point.
pub const CALLBACK_PARAM: &str = "callbackUrl";

// =============================================================================
// ROUTE RULES
// =============================================================================

/// Ordered set of protected path prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRules {
    prefixes: Vec<String>,
}

impl RouteRules {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { prefixes: prefixes.into_iter().map(Into::into).collect() }
    }

    #[must_use]
    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    /// Whether `path` (no query string) falls under any protected prefix.
    #[must_use]
    pub fn is_protected(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| prefix_matches(prefix, path))
    }
}

impl Default for RouteRules {
    fn default() -> Self {
        Self::new(DEFAULT_PROTECTED_PREFIXES.iter().copied())
    }
}

fn prefix_matches(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

// =============================================================================
// DECISION
// =============================================================================

/// Where to send an anonymous visitor, and where to bring them back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectIntent {
    /// Login entry point path, e.g. `/login`.
    pub target: String,
    /// Fully-qualified URL originally requested.
    pub callback_url: String,
}

impl RedirectIntent {
    /// `Location` header value: target plus the form-encoded callback parameter.
    #[must_use]
    pub fn location(&self) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair(CALLBACK_PARAM, &self.callback_url)
            .finish();
        format!("{}?{query}", self.target)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(RedirectIntent),
}

impl Decision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

// =============================================================================
// ACCESS POLICY
// =============================================================================

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    rules: RouteRules,
    login_path: String,
    public_origin: Url,
}

impl AccessPolicy {
    #[must_use]
    pub fn new(rules: RouteRules, login_path: impl Into<String>, public_origin: Url) -> Self {
        Self { rules, login_path: login_path.into(), public_origin }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            RouteRules::new(config.protected_prefixes.iter().cloned()),
            config.login_path.clone(),
            config.public_origin.clone(),
        )
    }

    #[must_use]
    pub fn rules(&self) -> &RouteRules {
        &self.rules
    }

    #[must_use]
    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    #[must_use]
    pub fn public_origin(&self) -> &Url {
        &self.public_origin
    }

    /// Decide whether a navigation to `target` (path plus optional query) may
    /// proceed for the given session.
    #[must_use]
    pub fn decide(&self, target: &str, session: Option<&Session>) -> Decision {
        let path = target.split(['?', '#']).next().unwrap_or(target);
        if !self.rules.is_protected(path) || session.is_some() {
            return Decision::Allow;
        }

        Decision::Redirect(RedirectIntent {
            target: self.login_path.clone(),
            callback_url: self.absolute_url(target),
        })
    }

    fn absolute_url(&self, target: &str) -> String {
        let origin = self.public_origin.as_str().trim_end_matches('/');
        format!("{origin}{target}")
    }
}

#[cfg(test)]
#[path = "policy_test.rs"]
mod tests;
