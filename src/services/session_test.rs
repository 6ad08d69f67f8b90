use super::*;
use crate::state::test_helpers::{BrokenSessions, MemorySessions};

// =============================================================================
// bytes_to_hex / generate_token
// =============================================================================

#[test]
fn bytes_to_hex_empty() {
    assert_eq!(bytes_to_hex(&[]), "");
}

#[test]
fn bytes_to_hex_leading_zero() {
    assert_eq!(bytes_to_hex(&[0x0a, 0xff]), "0aff");
}

#[test]
fn generate_token_is_64_hex_chars() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_token_two_calls_differ() {
    assert_ne!(generate_token(), generate_token());
}

// =============================================================================
// resolve_session
// =============================================================================

#[tokio::test]
async fn resolve_without_token_is_none() {
    let store = MemorySessions::default();
    assert!(resolve_session(&store, None).await.is_none());
    assert!(resolve_session(&store, Some("")).await.is_none());
}

#[tokio::test]
async fn resolve_unknown_token_is_none() {
    let store = MemorySessions::default();
    assert!(resolve_session(&store, Some("nope")).await.is_none());
}

#[tokio::test]
async fn resolve_known_token_returns_session() {
    let store = MemorySessions::default();
    let user_id = Uuid::new_v4();
    let token = store.create_session(user_id).await.unwrap();

    let session = resolve_session(&store, Some(&token)).await.unwrap();
    assert_eq!(session.token, token);
    assert_eq!(session.user.id, user_id);
}

#[tokio::test]
async fn resolve_fails_closed_on_store_error() {
    let store = BrokenSessions;
    assert!(resolve_session(&store, Some("any-token")).await.is_none());
}

#[tokio::test]
async fn deleted_session_no_longer_resolves() {
    let store = MemorySessions::default();
    let token = store.create_session(Uuid::new_v4()).await.unwrap();
    store.delete_session(&token).await.unwrap();
    assert!(resolve_session(&store, Some(&token)).await.is_none());
}
