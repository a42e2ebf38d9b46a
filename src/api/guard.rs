//! Route guard for protected pages.
//!
//! Static pages under the protected prefixes require a live session; an
//! anonymous visitor is redirected to the login page instead of seeing a
//! 401. API routes are excluded here because they answer with status codes,
//! not redirects.

use axum::{
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use super::AppState;
use super::auth::extract_session_token;
use crate::constants::PROTECTED_PAGE_PREFIXES;

pub const LOGIN_PAGE: &str = "/login";

fn is_protected_path(path: &str) -> bool {
    PROTECTED_PAGE_PREFIXES.iter().any(|prefix| {
        path == *prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
    })
}

pub async fn page_guard(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if path.starts_with("/api/") || !is_protected_path(&path) {
        return next.run(request).await;
    }

    let authenticated = match extract_session_token(request.headers()) {
        Some(token) => match state.auth.validate_session(&token).await {
            Ok(check) => check.is_authenticated(),
            Err(e) => {
                tracing::error!("Session lookup failed in page guard: {e}");
                false
            }
        },
        None => false,
    };

    if !authenticated {
        return Redirect::to(LOGIN_PAGE).into_response();
    }

    let mut response = next.run(request).await;

    // Protected pages must never come back from a shared cache after logout.
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, no-cache, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "permissions-policy",
        HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_protected_path() {
        assert!(is_protected_path("/events"));
        assert!(is_protected_path("/events/42"));
        assert!(is_protected_path("/tutorial"));
        assert!(is_protected_path("/committee-info"));

        assert!(!is_protected_path("/"));
        assert!(!is_protected_path("/login"));
        assert!(!is_protected_path("/eventsfoo"));
        assert!(!is_protected_path("/api/events"));
    }
}
