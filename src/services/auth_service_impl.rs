//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{PasswordPolicyConfig, SecurityConfig};
use crate::constants::limits::{USERNAME_MAX_LENGTH, USERNAME_MIN_LENGTH};
use crate::db::{CreateUserOutcome, Store, User, generate_session_id};
use crate::services::auth_service::{AuthError, AuthService, IssuedSession, SessionCheck};
use crate::services::rate_limit::RateLimiter;

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(store: Store, security: SecurityConfig, rate_limiter: Arc<RateLimiter>) -> Self {
        Self {
            store,
            security,
            rate_limiter,
        }
    }

    fn session_lifetime(&self) -> Duration {
        Duration::days(self.security.session_lifetime_days)
    }

    /// Opportunistic housekeeping on request paths. Failures are logged and
    /// swallowed; they must never fail the enclosing request.
    async fn sweep_expired_sessions(&self) {
        match self.store.delete_expired_sessions().await {
            Ok(0) => {}
            Ok(n) => debug!("Swept {n} expired sessions"),
            Err(e) => warn!("Failed to sweep expired sessions: {e}"),
        }
        self.rate_limiter.sweep();
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn signup(&self, username: &str, password: &str) -> Result<User, AuthError> {
        validate_username(username)?;
        validate_password(password, &self.security.password_policy)?;

        match self
            .store
            .create_user(username, password, &self.security)
            .await?
        {
            CreateUserOutcome::Created(user) => {
                debug!("Created user {} (pending verification)", user.username);
                Ok(user)
            }
            CreateUserOutcome::DuplicateUsername => Err(AuthError::DuplicateUsername),
        }
    }

    async fn login(&self, username: &str, password: &str) -> Result<IssuedSession, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Username and password are required".to_string(),
            ));
        }

        if self.rate_limiter.check(username) {
            return Err(AuthError::RateLimited);
        }

        // One variant for both unknown user and wrong password.
        let Some(user) = self.store.verify_user_password(username, password).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        if !user.verified {
            return Err(AuthError::NotVerified);
        }

        self.sweep_expired_sessions().await;

        let session_id = generate_session_id();
        let expires_at = Utc::now() + self.session_lifetime();

        self.store
            .create_session(&session_id, user.id, expires_at)
            .await?;

        self.rate_limiter.reset(username);
        debug!("Issued session for user {}", user.username);

        Ok(IssuedSession {
            session_id,
            expires_at,
        })
    }

    async fn logout(&self, session_id: &str) -> Result<(), AuthError> {
        self.store.delete_session(session_id).await?;
        Ok(())
    }

    async fn validate_session(&self, session_id: &str) -> Result<SessionCheck, AuthError> {
        self.sweep_expired_sessions().await;

        let Some(session) = self
            .store
            .find_session(session_id, self.session_lifetime())
            .await?
        else {
            return Ok(SessionCheck::Unauthenticated);
        };

        // The store already filters expired rows; re-verify before trusting
        // the result and delete-then-reject anything stale.
        match DateTime::parse_from_rfc3339(&session.expires_at) {
            Ok(expires_at) if expires_at.with_timezone(&Utc) > Utc::now() => {
                Ok(SessionCheck::Authenticated(session))
            }
            Ok(_) => {
                self.store.delete_session(session_id).await?;
                Ok(SessionCheck::Unauthenticated)
            }
            Err(e) => Err(AuthError::Internal(format!(
                "Malformed session expiry: {e}"
            ))),
        }
    }
}

fn validate_username(username: &str) -> Result<(), AuthError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&len) {
        return Err(AuthError::Validation(format!(
            "Username must be between {USERNAME_MIN_LENGTH} and {USERNAME_MAX_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_password(password: &str, policy: &PasswordPolicyConfig) -> Result<(), AuthError> {
    if password.chars().count() < policy.min_length {
        return Err(AuthError::Validation(format!(
            "Password must be at least {} characters",
            policy.min_length
        )));
    }

    if policy.require_mixed_case
        && !(password.chars().any(char::is_uppercase) && password.chars().any(char::is_lowercase))
    {
        return Err(AuthError::Validation(
            "Password must contain both upper and lower case letters".to_string(),
        ));
    }

    if policy.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::Validation(
            "Password must contain a digit".to_string(),
        ));
    }

    if policy.require_symbol && password.chars().all(char::is_alphanumeric) {
        return Err(AuthError::Validation(
            "Password must contain a symbol".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username_bounds() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("abc").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(50)).is_ok());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_password_min_length() {
        let policy = PasswordPolicyConfig::default();
        assert!(validate_password("hunter2", &policy).is_ok());
        assert!(validate_password("short", &policy).is_err());
    }

    #[test]
    fn test_validate_password_strict_policy() {
        let policy = PasswordPolicyConfig {
            min_length: 8,
            require_mixed_case: true,
            require_digit: true,
            require_symbol: true,
        };
        assert!(validate_password("Sup3rSecret!", &policy).is_ok());
        assert!(validate_password("sup3rsecret!", &policy).is_err());
        assert!(validate_password("SuperSecret!", &policy).is_err());
        assert!(validate_password("Sup3rSecret", &policy).is_err());
    }
}
