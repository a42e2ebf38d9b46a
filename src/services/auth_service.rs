//! Domain service for authentication and session management.
//!
//! Handles signup, login, logout, and session validation with sliding
//! expiration. Verification of new accounts is an administrative action
//! outside this service.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::{Session, User};

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed or missing input; always client-correctable.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Unknown username and wrong password deliberately share this variant
    /// so the response cannot be used for username enumeration.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Credentials were correct but the account awaits admin approval.
    /// Safe to disclose.
    #[error("Account pending verification")]
    NotVerified,

    #[error("Username already taken")]
    DuplicateUsername,

    #[error("Too many attempts, try again later")]
    RateLimited,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// A freshly issued session: the opaque token plus the expiry the cookie
/// must be synchronized to.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session_id: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of validating a bearer token. Modeled as data so the API layer
/// turns `Unauthenticated` into a 401 payload while the page guard turns it
/// into a redirect; the service itself never decides control flow.
#[derive(Debug, Clone)]
pub enum SessionCheck {
    Authenticated(Session),
    Unauthenticated,
}

impl SessionCheck {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Registers a new, unverified account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for policy violations and
    /// [`AuthError::DuplicateUsername`] when the name is taken.
    async fn signup(&self, username: &str, password: &str) -> Result<User, AuthError>;

    /// Verifies credentials and issues a session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] on mismatch and
    /// [`AuthError::NotVerified`] for unapproved accounts.
    async fn login(&self, username: &str, password: &str) -> Result<IssuedSession, AuthError>;

    /// Deletes the session. Idempotent; unknown tokens are not an error.
    async fn logout(&self, session_id: &str) -> Result<(), AuthError>;

    /// Resolves a token to an active session, renewing its expiry.
    /// Expired and unknown tokens are both `Unauthenticated`.
    async fn validate_session(&self, session_id: &str) -> Result<SessionCheck, AuthError>;
}
