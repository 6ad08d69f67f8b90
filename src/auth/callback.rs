//! Post-login resumption URL validation.
//!
//! The login flow receives `callbackUrl` from the query string, which makes
//! it attacker-controlled. Only targets on the storefront's own origin are
//! honored; they are reduced to a local path so the eventual `Location`
//! header can never name another host.

use url::{Position, Url};

/// Where to land when the callback is missing or rejected.
pub const SAFE_DEFAULT: &str = "/";

/// Return a same-origin local path for `raw`, or [`SAFE_DEFAULT`].
#[must_use]
pub fn sanitize_callback_url(raw: Option<&str>, origin: &Url) -> String {
    raw.map(str::trim)
        .filter(|r| !r.is_empty())
        .and_then(|r| local_target(r, origin))
        .unwrap_or_else(|| SAFE_DEFAULT.to_owned())
}

fn local_target(raw: &str, origin: &Url) -> Option<String> {
    // Browsers treat `\` as `/`, so `/\evil.example` is protocol-relative.
    if raw.contains('\\') || raw.chars().any(char::is_control) {
        return None;
    }

    let resolved = if raw.starts_with('/') {
        if raw.starts_with("//") {
            return None;
        }
        origin.join(raw).ok()?
    } else {
        Url::parse(raw).ok()?
    };

    if resolved.origin() != origin.origin() {
        return None;
    }

    // Dot segments can normalize into a protocol-relative path (`/.//evil`).
    let target = &resolved[Position::BeforePath..];
    if !target.starts_with('/') || target.starts_with("//") {
        return None;
    }
    Some(target.to_owned())
}

#[cfg(test)]
#[path = "callback_test.rs"]
mod tests;
