//! Authentication endpoints and the session middleware.
//!
//! The session token travels in an opaque `session` cookie. Cookies are
//! built and parsed by hand here so the attributes stay in one place:
//! HttpOnly, SameSite=Strict, Path=/, Expires synced to the row in the
//! sessions table, and Secure when the deployment terminates TLS.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use super::AppState;
use super::error::ApiError;
use super::types::{
    ApiResponse, LoginRequest, MessageResponse, SessionCheckResponse, SignupRequest, UserResponse,
};
use crate::constants::SESSION_COOKIE;
use crate::services::SessionCheck;

/// Identity of the authenticated caller, inserted into request extensions
/// by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub session_id: String,
    pub user_id: i32,
}

/// Pull the session token out of a `Cookie` header.
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;

    cookie_header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Whether to mark cookies Secure: either forced by config or detected from
/// the reverse proxy's `x-forwarded-proto`.
fn wants_secure(headers: &HeaderMap, force_secure: bool) -> bool {
    force_secure
        || headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}

fn session_cookie(session_id: &str, expires_at: DateTime<Utc>, secure: bool) -> String {
    let expires = expires_at.format("%a, %d %b %Y %H:%M:%S GMT");
    let mut cookie = format!(
        "{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Strict; Expires={expires}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), ApiError> {
    let user = state.auth.signup(&payload.username, &payload.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserResponse::from(user))),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let issued = state.auth.login(&payload.username, &payload.password).await?;

    let secure = wants_secure(&headers, state.force_secure_cookies);
    let cookie = session_cookie(&issued.session_id, issued.expires_at, secure);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::success(MessageResponse::new("Logged in"))),
    )
        .into_response())
}

/// Idempotent: succeeds and clears the cookie whether or not the token
/// still names a live session.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = extract_session_token(&headers) {
        state.auth.logout(&token).await?;
    }

    let secure = wants_secure(&headers, state.force_secure_cookies);

    Ok((
        [(header::SET_COOKIE, clear_session_cookie(secure))],
        Json(ApiResponse::success(MessageResponse::new("Logged out"))),
    )
        .into_response())
}

/// `GET /api/auth/check`: 200 `{"valid":true}` for a live session, 401
/// `{"valid":false}` otherwise. Never an error body; clients poll this.
pub async fn session_check(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(token) = extract_session_token(&headers) else {
        return invalid_session_response(StatusCode::UNAUTHORIZED);
    };

    match state.auth.validate_session(&token).await {
        Ok(SessionCheck::Authenticated(_)) => {
            (StatusCode::OK, Json(SessionCheckResponse { valid: true })).into_response()
        }
        Ok(SessionCheck::Unauthenticated) => invalid_session_response(StatusCode::UNAUTHORIZED),
        Err(e) => {
            tracing::error!("Session check failed: {e}");
            invalid_session_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn invalid_session_response(status: StatusCode) -> Response {
    (status, Json(SessionCheckResponse { valid: false })).into_response()
}

/// Middleware guarding the event API: resolves the cookie to a session and
/// exposes it to handlers as a [`CurrentSession`] extension.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = extract_session_token(request.headers()) else {
        return ApiError::Unauthorized("Authentication required".to_string()).into_response();
    };

    match state.auth.validate_session(&token).await {
        Ok(SessionCheck::Authenticated(session)) => {
            debug!("Authenticated request for user {}", session.user_id);
            request.extensions_mut().insert(CurrentSession {
                session_id: session.id,
                user_id: session.user_id,
            });
            next.run(request).await
        }
        Ok(SessionCheck::Unauthenticated) => {
            ApiError::Unauthorized("Session expired or invalid".to_string()).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_session_token() {
        let headers = headers_with_cookie("session=abc123");
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc123"));

        let headers = headers_with_cookie("theme=dark; session=abc123; lang=en");
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc123"));

        let headers = headers_with_cookie("sessionx=abc123");
        assert_eq!(extract_session_token(&headers), None);

        assert_eq!(extract_session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let expires_at = DateTime::parse_from_rfc3339("2025-06-08T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        let cookie = session_cookie("tok", expires_at, false);
        assert!(cookie.starts_with("session=tok; "));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Expires=Sun, 08 Jun 2025 12:00:00 GMT"));
        assert!(!cookie.contains("Secure"));

        let cookie = session_cookie("tok", expires_at, true);
        assert!(cookie.ends_with("; Secure"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(false);
        assert!(cookie.starts_with("session=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_wants_secure() {
        let mut headers = HeaderMap::new();
        assert!(!wants_secure(&headers, false));
        assert!(wants_secure(&headers, true));

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert!(wants_secure(&headers, false));

        headers.insert("x-forwarded-proto", HeaderValue::from_static("http"));
        assert!(!wants_secure(&headers, false));
    }
}
