//! End-to-end tests over the router with an in-memory database.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use tsudoi::config::Config;
use tsudoi::db::Store;

async fn spawn_app() -> (Router, Store) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();

    // Single connection so every request sees the same in-memory database.
    let store = Store::with_pool_options(&config.general.database_path, 1, 1)
        .await
        .expect("Failed to open in-memory store");

    let state = tsudoi::api::create_app_state_with_store(&config, store.clone())
        .expect("Failed to create app state");

    (tsudoi::api::router(state), store)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, format!("session={cookie}"));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("JSON body")
}

fn session_token(response: &Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Set-Cookie header")
        .to_str()
        .unwrap();

    set_cookie
        .strip_prefix("session=")
        .and_then(|rest| rest.split(';').next())
        .expect("session cookie value")
        .to_string()
}

/// Signup, approve via the store (the admin path), and log in.
async fn create_verified_user(app: &Router, store: &Store, username: &str) -> String {
    let response = send(
        app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({"username": username, "password": "hunter22"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    assert!(store.set_user_verified(username, true).await.unwrap());

    let response = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": username, "password": "hunter22"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    session_token(&response)
}

async fn create_event(app: &Router, cookie: &str, title: &str) -> i64 {
    let response = send(
        app,
        "POST",
        "/api/events",
        Some(cookie),
        Some(json!({
            "title": title,
            "description": "Bring snacks",
            "event_date": "2025-09-01",
            "event_time": "18:30",
            "location": "Room 101"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    body["data"]["id"].as_i64().expect("event id")
}

#[tokio::test]
async fn test_signup_validation_and_conflict() {
    let (app, _store) = spawn_app().await;

    let response = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({"username": "alice", "password": "hunter22"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["username"], json!("alice"));
    assert_eq!(body["data"]["verified"], json!(false));

    // Same name again is a conflict, not a validation error.
    let response = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({"username": "alice", "password": "different8"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({"username": "ab", "password": "hunter22"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({"username": "bob", "password": "short"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_gated_on_verification() {
    let (app, store) = spawn_app().await;

    send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({"username": "alice", "password": "hunter22"})),
    )
    .await;

    // Correct credentials, but the account is not approved yet.
    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "alice", "password": "hunter22"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    store.set_user_verified("alice", true).await.unwrap();

    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "alice", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "nobody", "password": "hunter22"})),
    )
    .await;
    // Unknown user and wrong password are indistinguishable.
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "alice", "password": "hunter22"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("session="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(set_cookie.contains("Expires="));
    assert!(!set_cookie.contains("Secure"));
}

#[tokio::test]
async fn test_login_rate_limited_after_repeated_failures() {
    let (app, store) = spawn_app().await;
    send(
        &app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({"username": "alice", "password": "hunter22"})),
    )
    .await;
    store.set_user_verified("alice", true).await.unwrap();

    for _ in 0..5 {
        let response = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"username": "alice", "password": "wrong"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Sixth attempt is throttled even with the right password.
    let response = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"username": "alice", "password": "hunter22"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_session_check_and_logout() {
    let (app, store) = spawn_app().await;

    let response = send(&app, "GET", "/api/auth/check", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({"valid": false}));

    let response = send(&app, "GET", "/api/auth/check", Some("garbage"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let cookie = create_verified_user(&app, &store, "alice").await;

    let response = send(&app, "GET", "/api/auth/check", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"valid": true}));

    let response = send(&app, "POST", "/api/auth/logout", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.contains("Max-Age=0"));

    // The token no longer resolves.
    let response = send(&app, "GET", "/api/auth/check", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Logging out again is fine.
    let response = send(&app, "POST", "/api/auth/logout", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_event_api_requires_auth() {
    let (app, _store) = spawn_app().await;

    let response = send(&app, "GET", "/api/events", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, "GET", "/api/events", Some("not-a-session"), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_event_crud() {
    let (app, store) = spawn_app().await;
    let cookie = create_verified_user(&app, &store, "alice").await;

    // Bad payloads are rejected before touching the store.
    let response = send(
        &app,
        "POST",
        "/api/events",
        Some(&cookie),
        Some(json!({
            "title": "Game night",
            "event_date": "next tuesday",
            "event_time": "18:30",
            "location": "Room 101"
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let event_id = create_event(&app, &cookie, "Game <b>night</b>").await;

    let response = send(&app, "GET", "/api/events", Some(&cookie), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let events = body["data"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    // Markup was stripped on the way in.
    assert_eq!(events[0]["title"], json!("Game bnight/b"));
    assert_eq!(events[0]["creator_username"], json!("alice"));

    let response = send(
        &app,
        "GET",
        &format!("/api/events/{event_id}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["is_creator"], json!(true));
    assert_eq!(body["data"]["location"], json!("Room 101"));

    let response = send(
        &app,
        "PATCH",
        &format!("/api/events/{event_id}"),
        Some(&cookie),
        Some(json!({"location": "Main hall"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["location"], json!("Main hall"));
    assert_eq!(body["data"]["title"], json!("Game bnight/b"));

    let response = send(
        &app,
        "PATCH",
        &format!("/api/events/{event_id}"),
        Some(&cookie),
        Some(json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "DELETE",
        &format!("/api/events/{event_id}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        "GET",
        &format!("/api/events/{event_id}"),
        Some(&cookie),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_event_ownership_collapsed_to_not_found() {
    let (app, store) = spawn_app().await;
    let alice = create_verified_user(&app, &store, "alice").await;
    let bob = create_verified_user(&app, &store, "bob").await;

    let event_id = create_event(&app, &alice, "Planning meeting").await;

    // Someone else's event and a nonexistent event answer identically.
    let response = send(
        &app,
        "DELETE",
        &format!("/api/events/{event_id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "DELETE", "/api/events/999999", Some(&bob), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app,
        "PATCH",
        &format!("/api/events/{event_id}"),
        Some(&bob),
        Some(json!({"title": "Hijacked"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The event is untouched.
    let response = send(
        &app,
        "GET",
        &format!("/api/events/{event_id}"),
        Some(&alice),
        None,
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["title"], json!("Planning meeting"));
}

#[tokio::test]
async fn test_rsvp_upsert_keeps_latest_answer() {
    let (app, store) = spawn_app().await;
    let alice = create_verified_user(&app, &store, "alice").await;
    let bob = create_verified_user(&app, &store, "bob").await;

    let event_id = create_event(&app, &alice, "Potluck").await;

    let response = send(
        &app,
        "POST",
        &format!("/api/events/{event_id}/rsvp"),
        Some(&bob),
        Some(json!({"status": "attending"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        "POST",
        "/api/events/999999/rsvp",
        Some(&bob),
        Some(json!({"status": "yes"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app,
        "POST",
        &format!("/api/events/{event_id}/rsvp"),
        Some(&bob),
        Some(json!({"status": "yes"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // A second answer overwrites the first instead of adding a row.
    let response = send(
        &app,
        "POST",
        &format!("/api/events/{event_id}/rsvp"),
        Some(&bob),
        Some(json!({"status": "maybe", "comment": "depends on work"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], json!("maybe"));

    let response = send(&app, "GET", "/api/events", Some(&bob), None).await;
    let body = body_json(response).await;
    let event = &body["data"].as_array().unwrap()[0];
    assert_eq!(event["rsvp_counts"]["yes"], json!(0));
    assert_eq!(event["rsvp_counts"]["maybe"], json!(1));
    assert_eq!(event["user_rsvp"], json!("maybe"));

    let response = send(
        &app,
        "GET",
        &format!("/api/events/{event_id}"),
        Some(&alice),
        None,
    )
    .await;
    let body = body_json(response).await;
    let attendees = body["data"]["attendees"].as_array().unwrap();
    assert_eq!(attendees.len(), 1);
    assert_eq!(attendees[0]["username"], json!("bob"));
    assert_eq!(attendees[0]["comment"], json!("depends on work"));
}

#[tokio::test]
async fn test_protected_pages_redirect_anonymous_visitors() {
    let (app, store) = spawn_app().await;

    let response = send(&app, "GET", "/events", None, None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/login"
    );

    let response = send(&app, "GET", "/events/42", Some("stale-token"), None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // Authenticated visitors get the page (here a 404 from the empty static
    // dir) with cache suppression applied.
    let cookie = create_verified_user(&app, &store, "alice").await;
    let response = send(&app, "GET", "/events", Some(&cookie), None).await;
    assert_ne!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store, no-cache, must-revalidate"
    );
}
