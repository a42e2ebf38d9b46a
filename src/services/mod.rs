pub mod auth_service;
pub mod auth_service_impl;
pub mod rate_limit;

pub use auth_service::{AuthError, AuthService, IssuedSession, SessionCheck};
pub use auth_service_impl::SeaOrmAuthService;
pub use rate_limit::RateLimiter;
