pub const SESSION_COOKIE: &str = "session";

pub mod session {

    pub const LIFETIME_DAYS: i64 = 7;

    /// Skip the renewal write when the session was already extended this
    /// recently; the observable expiry never moves backward either way.
    pub const RENEWAL_SKIP_MINUTES: i64 = 60;
}

pub mod limits {

    pub const USERNAME_MIN_LENGTH: usize = 3;

    pub const USERNAME_MAX_LENGTH: usize = 50;

    pub const TITLE_MAX_LENGTH: usize = 200;

    pub const LOCATION_MAX_LENGTH: usize = 200;

    pub const DESCRIPTION_MAX_LENGTH: usize = 2000;

    pub const COMMENT_MAX_LENGTH: usize = 500;
}

/// Page prefixes behind the redirect-to-login guard.
pub const PROTECTED_PAGE_PREFIXES: &[&str] = &["/events", "/tutorial", "/committee-info"];
