//! Store-level tests for session lifecycle and sliding expiration.

use chrono::{DateTime, Duration, Utc};
use tsudoi::config::SecurityConfig;
use tsudoi::db::{CreateUserOutcome, Store, generate_session_id};

const LIFETIME: Duration = Duration::days(7);

async fn spawn_store() -> Store {
    // Single connection so the in-memory database is shared across queries.
    Store::with_pool_options("sqlite::memory:", 1, 1)
        .await
        .expect("Failed to open in-memory store")
}

async fn seed_user(store: &Store, username: &str) -> i32 {
    match store
        .create_user(username, "hunter22", &SecurityConfig::default())
        .await
        .expect("Failed to create user")
    {
        CreateUserOutcome::Created(user) => user.id,
        CreateUserOutcome::DuplicateUsername => panic!("Duplicate username in fresh store"),
    }
}

fn parse(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("RFC 3339 expiry")
        .with_timezone(&Utc)
}

#[tokio::test]
async fn test_unknown_token_is_absent() {
    let store = spawn_store().await;
    let found = store.find_session("no-such-token", LIFETIME).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_expired_session_is_absent_and_deleted() {
    let store = spawn_store().await;
    let user_id = seed_user(&store, "alice").await;

    let token = generate_session_id();
    store
        .create_session(&token, user_id, Utc::now() - Duration::hours(1))
        .await
        .unwrap();

    let found = store.find_session(&token, LIFETIME).await.unwrap();
    assert!(found.is_none());

    // The lookup dropped the stale row, not just hid it.
    assert_eq!(store.count_sessions_for_user(user_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_stale_session_is_renewed_forward() {
    let store = spawn_store().await;
    let user_id = seed_user(&store, "alice").await;

    let token = generate_session_id();
    let original_expiry = Utc::now() + Duration::days(2);
    store
        .create_session(&token, user_id, original_expiry)
        .await
        .unwrap();

    let session = store
        .find_session(&token, LIFETIME)
        .await
        .unwrap()
        .expect("live session");

    let renewed = parse(&session.expires_at);
    assert!(renewed > original_expiry);
    assert!(renewed > Utc::now() + Duration::days(6));
}

#[tokio::test]
async fn test_fresh_session_keeps_its_expiry() {
    let store = spawn_store().await;
    let user_id = seed_user(&store, "alice").await;

    let token = generate_session_id();
    let expiry = Utc::now() + LIFETIME;
    store.create_session(&token, user_id, expiry).await.unwrap();

    let session = store
        .find_session(&token, LIFETIME)
        .await
        .unwrap()
        .expect("live session");

    // Renewed within the skip window, so the stored value is untouched.
    assert_eq!(parse(&session.expires_at).timestamp(), expiry.timestamp());
}

#[tokio::test]
async fn test_renewal_never_shortens_a_session() {
    let store = spawn_store().await;
    let user_id = seed_user(&store, "alice").await;

    let token = generate_session_id();
    let far_expiry = Utc::now() + Duration::days(30);
    store
        .create_session(&token, user_id, far_expiry)
        .await
        .unwrap();

    let session = store
        .find_session(&token, LIFETIME)
        .await
        .unwrap()
        .expect("live session");

    assert_eq!(
        parse(&session.expires_at).timestamp(),
        far_expiry.timestamp()
    );
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let store = spawn_store().await;
    let user_id = seed_user(&store, "alice").await;

    let token = generate_session_id();
    store
        .create_session(&token, user_id, Utc::now() + LIFETIME)
        .await
        .unwrap();

    store.delete_session(&token).await.unwrap();
    store.delete_session(&token).await.unwrap();
    store.delete_session("never-existed").await.unwrap();

    assert_eq!(store.count_sessions_for_user(user_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_expired_reports_count() {
    let store = spawn_store().await;
    let user_id = seed_user(&store, "alice").await;

    for _ in 0..2 {
        store
            .create_session(
                &generate_session_id(),
                user_id,
                Utc::now() - Duration::minutes(5),
            )
            .await
            .unwrap();
    }

    let live_token = generate_session_id();
    store
        .create_session(&live_token, user_id, Utc::now() + LIFETIME)
        .await
        .unwrap();

    assert_eq!(store.delete_expired_sessions().await.unwrap(), 2);
    assert!(
        store
            .find_session(&live_token, LIFETIME)
            .await
            .unwrap()
            .is_some()
    );
}
