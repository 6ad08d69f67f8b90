use uuid::Uuid;

use super::*;
use crate::services::session::SessionUser;

fn policy() -> AccessPolicy {
    AccessPolicy::new(RouteRules::default(), "/login", Url::parse("http://shop.test").unwrap())
}

fn session() -> Session {
    Session {
        token: "tok".into(),
        user: SessionUser { id: Uuid::new_v4(), name: "ada".into(), email: "ada@example.com".into() },
    }
}

// =============================================================================
// RouteRules
// =============================================================================

#[test]
fn exact_prefix_is_protected() {
    let rules = RouteRules::default();
    assert!(rules.is_protected("/me"));
    assert!(rules.is_protected("/dashboard"));
    assert!(rules.is_protected("/reviews"));
}

#[test]
fn nested_path_is_protected() {
    let rules = RouteRules::default();
    assert!(rules.is_protected("/me/"));
    assert!(rules.is_protected("/me/addresses/7"));
    assert!(rules.is_protected("/reviews/new"));
}

#[test]
fn sibling_with_shared_prefix_is_public() {
    let rules = RouteRules::default();
    assert!(!rules.is_protected("/reviews-archive"));
    assert!(!rules.is_protected("/reviews-extra"));
    assert!(!rules.is_protected("/menu"));
    assert!(!rules.is_protected("/dashboards"));
}

#[test]
fn unrelated_paths_are_public() {
    let rules = RouteRules::default();
    for path in ["/", "/products/12", "/login", "/api/wishlist", "/cart"] {
        assert!(!rules.is_protected(path), "{path} should be public");
    }
}

#[test]
fn matching_follows_exact_or_separator_rule_for_every_prefix() {
    let rules = RouteRules::new(["/orders", "/me"]);
    let candidates = ["/orders", "/orders/", "/orders/9", "/ordersx", "/order", "/me", "/me/x", "/mex", "/", ""];
    for path in candidates {
        let expected = rules
            .prefixes()
            .iter()
            .any(|p| path == p || path.starts_with(&format!("{p}/")));
        assert_eq!(rules.is_protected(path), expected, "classification mismatch for {path:?}");
    }
}

#[test]
fn empty_rules_protect_nothing() {
    let rules = RouteRules::new(Vec::<String>::new());
    assert!(!rules.is_protected("/me"));
}

// =============================================================================
// AccessPolicy::decide
// =============================================================================

#[test]
fn public_path_is_allowed_without_session() {
    assert_eq!(policy().decide("/products/1", None), Decision::Allow);
}

#[test]
fn protected_path_is_allowed_with_session() {
    let s = session();
    assert_eq!(policy().decide("/me", Some(&s)), Decision::Allow);
}

#[test]
fn anonymous_protected_path_redirects_with_callback() {
    let decision = policy().decide("/me/anything", None);
    let Decision::Redirect(intent) = decision else {
        panic!("expected redirect");
    };
    assert_eq!(intent.target, "/login");
    assert_eq!(intent.callback_url, "http://shop.test/me/anything");
    assert_eq!(intent.location(), "/login?callbackUrl=http%3A%2F%2Fshop.test%2Fme%2Fanything");
}

#[test]
fn query_string_is_kept_in_callback_but_ignored_for_matching() {
    let decision = policy().decide("/dashboard?tab=orders&page=2", None);
    let Decision::Redirect(intent) = decision else {
        panic!("expected redirect");
    };
    assert_eq!(intent.callback_url, "http://shop.test/dashboard?tab=orders&page=2");

    assert_eq!(policy().decide("/reviews-archive?x=/reviews", None), Decision::Allow);
}

#[test]
fn custom_login_path_is_used() {
    let policy = AccessPolicy::new(RouteRules::new(["/me"]), "/account/sign-in", Url::parse("https://shop.test").unwrap());
    let Decision::Redirect(intent) = policy.decide("/me", None) else {
        panic!("expected redirect");
    };
    assert!(intent.location().starts_with("/account/sign-in?callbackUrl="));
}

#[test]
fn is_allowed_helper() {
    assert!(Decision::Allow.is_allowed());
    assert!(!policy().decide("/me", None).is_allowed());
}
